use crate::domain::{GridPosition, SquareRecord, SQUARES_PER_PARCEL};
use std::collections::BTreeSet;

/// Occupancy view over the squares a user has claimed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LandGrid {
    occupied: BTreeSet<GridPosition>,
    owned: usize,
}

impl LandGrid {
    pub fn from_squares<'a>(squares: impl IntoIterator<Item = &'a SquareRecord>) -> Self {
        let mut grid = LandGrid::default();
        for square in squares {
            grid.occupied.insert(square.position);
            grid.owned += 1;
        }
        grid
    }

    pub fn is_occupied(&self, position: GridPosition) -> bool {
        self.occupied.contains(&position)
    }

    /// First free square, scanning rows top to bottom and columns left to right.
    pub fn next_free(&self) -> Option<GridPosition> {
        GridPosition::all().find(|p| !self.is_occupied(*p))
    }

    pub fn owned_count(&self) -> usize {
        self.owned
    }

    pub fn total_parcels(&self) -> usize {
        self.owned / SQUARES_PER_PARCEL
    }

    pub fn completion_percentage(&self) -> u32 {
        ((self.owned * 100 + SQUARES_PER_PARCEL / 2) / SQUARES_PER_PARCEL) as u32
    }

    pub fn is_complete(&self) -> bool {
        self.occupied.len() >= SQUARES_PER_PARCEL
    }
}
