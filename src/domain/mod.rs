//! Domain types for the land conversion service.
//!
//! This module provides:
//! - Exact money/unit arithmetic via the Decimal wrapper
//! - Domain primitives: UserId, PaymentId, LandType
//! - Grid coordinates with bounds checking
//! - Ledger records: users, reward balances, squares, pending payments

pub mod decimal;
pub mod grid;
pub mod primitives;
pub mod records;

pub use decimal::Decimal;
pub use grid::{GridError, GridPosition, GRID_SIZE, SQUARES_PER_PARCEL};
pub use primitives::{LandType, PaymentId, UnknownLandType, UserId};
pub use records::{
    GameData, InvestmentConversion, NewUser, PaymentConversion, PendingPayment, RewardBalance,
    SquareRecord, UserProfile,
};
