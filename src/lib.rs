pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod orchestration;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{Decimal, GridPosition, LandType, PaymentId, UserId};
pub use engine::{
    AllocationTracker, ConversionCalculator, ConversionError, RateSchedule, RateTable,
    RoundingPolicy,
};
pub use error::AppError;
pub use ledger::{LedgerError, MemoryLedger, MissingRecordPolicy, RewardLedger, SqliteLedger};
pub use orchestration::{ConversionService, ServiceError};
