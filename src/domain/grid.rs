//! Bounds-checked coordinates on a user's 5×5 land grid.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of squares along each side of a land parcel.
pub const GRID_SIZE: u8 = 5;

/// Squares needed to complete one parcel.
pub const SQUARES_PER_PARCEL: usize = (GRID_SIZE as usize) * (GRID_SIZE as usize);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("square ({x}, {y}) is outside the {size}x{size} grid", size = GRID_SIZE)]
    OutOfBounds { x: i64, y: i64 },
}

/// A square on the grid; `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    x: u8,
    y: u8,
}

impl GridPosition {
    pub fn new(x: i64, y: i64) -> Result<Self, GridError> {
        let in_bounds = |v: i64| (0..GRID_SIZE as i64).contains(&v);
        if in_bounds(x) && in_bounds(y) {
            Ok(GridPosition {
                x: x as u8,
                y: y as u8,
            })
        } else {
            Err(GridError::OutOfBounds { x, y })
        }
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    /// All positions in claim order: rows top to bottom, columns left to right.
    pub fn all() -> impl Iterator<Item = GridPosition> {
        (0..GRID_SIZE).flat_map(|y| (0..GRID_SIZE).map(move |x| GridPosition { x, y }))
    }
}

impl std::fmt::Display for GridPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_bounds() {
        assert!(GridPosition::new(0, 0).is_ok());
        assert!(GridPosition::new(4, 4).is_ok());
        assert_eq!(
            GridPosition::new(5, 0),
            Err(GridError::OutOfBounds { x: 5, y: 0 })
        );
        assert_eq!(
            GridPosition::new(0, -1),
            Err(GridError::OutOfBounds { x: 0, y: -1 })
        );
    }

    #[test]
    fn test_all_positions_in_row_major_order() {
        let all: Vec<_> = GridPosition::all().collect();
        assert_eq!(all.len(), SQUARES_PER_PARCEL);
        assert_eq!(all[0], GridPosition::new(0, 0).unwrap());
        assert_eq!(all[1], GridPosition::new(1, 0).unwrap());
        assert_eq!(all[5], GridPosition::new(0, 1).unwrap());
        assert_eq!(all[24], GridPosition::new(4, 4).unwrap());
    }
}
