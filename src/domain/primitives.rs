//! Domain primitives: UserId, PaymentId, LandType.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Identifier of an employee or investor (e.g. "employee_001").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a pending bonus payment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

impl PaymentId {
    pub fn new(id: impl Into<String>) -> Self {
        PaymentId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of land types a reward or grid square can carry.
///
/// `Forest`, `House` and `Tree` are the legacy grid types; the conversion
/// flows price `JunglePlot`, `Flathouse` and `FlathouseMini`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandType {
    JunglePlot,
    Flathouse,
    FlathouseMini,
    Forest,
    House,
    Tree,
}

impl LandType {
    pub const ALL: [LandType; 6] = [
        LandType::JunglePlot,
        LandType::Flathouse,
        LandType::FlathouseMini,
        LandType::Forest,
        LandType::House,
        LandType::Tree,
    ];

    /// Stable storage key.
    pub fn key(&self) -> &'static str {
        match self {
            LandType::JunglePlot => "jungle_plot",
            LandType::Flathouse => "flathouse",
            LandType::FlathouseMini => "flathouse_mini",
            LandType::Forest => "forest",
            LandType::House => "house",
            LandType::Tree => "tree",
        }
    }

    /// Human readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            LandType::JunglePlot => "Jungle Plot",
            LandType::Flathouse => "Flathouse",
            LandType::FlathouseMini => "Flathouse Mini",
            LandType::Forest => "Forest",
            LandType::House => "House",
            LandType::Tree => "Tree",
        }
    }
}

impl std::fmt::Display for LandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Error returned when a label names no known land type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown land type: {0}")]
pub struct UnknownLandType(pub String);

impl FromStr for LandType {
    type Err = UnknownLandType;

    /// Accepts `jungle_plot`, `jungle plot` and `Jungle Plot` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        LandType::ALL
            .into_iter()
            .find(|t| t.key() == normalized)
            .ok_or_else(|| UnknownLandType(s.to_string()))
    }
}
