//! Pure conversion and allocation logic.
//!
//! Nothing in here touches the ledger; callers compute a result, persist it
//! through a `RewardLedger`, and only then mark an allocation committed.

use crate::domain::{Decimal, LandType, UnknownLandType};
use thiserror::Error;

pub mod allocation;
pub mod calculator;
pub mod grid;
pub mod rates;

pub use allocation::{AllocationState, AllocationTracker};
pub use calculator::{
    AllocationLine, AllocationSummary, ConversionCalculator, ConversionResult, RoundingPolicy,
};
pub use grid::LandGrid;
pub use rates::{LandTypeRate, RateSchedule, RateTable};

/// Validation failures raised by the calculator and the allocation tracker.
///
/// Every variant is user-correctable and leaves tracker state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("unknown land type: {0}")]
    UnknownLandType(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invalid rate: {0}")]
    InvalidRate(String),
    #[error("{land_type} requires at least {min_units} units (minimum ${min_amount})")]
    BelowMinimum {
        land_type: LandType,
        min_units: u32,
        min_amount: Decimal,
    },
    #[error("total allocation would cost ${required}, exceeding the budget of ${budget}")]
    BudgetExceeded { required: Decimal, budget: Decimal },
    #[error("insufficient remaining amount for {land_type}: need ${required}, have ${available}")]
    InsufficientRemaining {
        land_type: LandType,
        required: Decimal,
        available: Decimal,
    },
    #[error("allocate the budget to at least one land type")]
    NothingAllocated,
    #[error("${remaining} is still unallocated")]
    UnallocatedFunds { remaining: Decimal },
    #[error("allocation has already been committed")]
    AlreadyCommitted,
}

impl From<UnknownLandType> for ConversionError {
    fn from(err: UnknownLandType) -> Self {
        ConversionError::UnknownLandType(err.0)
    }
}
