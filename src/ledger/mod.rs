//! Reward ledger abstraction: the system of record for users, reward
//! balances, claimed squares and pending payments.

use crate::config::{Config, LedgerBackend};
use crate::db::{init_db, Repository};
use crate::domain::{
    Decimal, GridError, GridPosition, LandType, NewUser, PaymentId, PendingPayment, RewardBalance,
    SquareRecord, UserId, UserProfile,
};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub mod demo;
pub mod memory;
pub mod sqlite;

pub use demo::DemoData;
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

/// How writes treat a land type the user has no reward row for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingRecordPolicy {
    /// Insert the row with the new count.
    #[default]
    CreateOnAbsent,
    /// Fail with `LedgerError::NotFound`.
    RejectOnAbsent,
}

impl FromStr for MissingRecordPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" | "create_on_absent" => Ok(MissingRecordPolicy::CreateOnAbsent),
            "reject" | "reject_on_absent" => Ok(MissingRecordPolicy::RejectOnAbsent),
            other => Err(format!("must be create or reject, got {}", other)),
        }
    }
}

impl MissingRecordPolicy {
    /// Starting balance for a land type the user has no row for.
    fn absent_balance(&self, user: &UserId, land_type: LandType) -> Result<Decimal, LedgerError> {
        match self {
            MissingRecordPolicy::CreateOnAbsent => Ok(Decimal::zero()),
            MissingRecordPolicy::RejectOnAbsent => Err(LedgerError::NotFound(format!(
                "{} reward row for user {}",
                land_type, user
            ))),
        }
    }
}

/// `current + delta`, refusing to go below zero.
fn apply_delta(land_type: LandType, current: Decimal, delta: Decimal) -> Result<Decimal, LedgerError> {
    let next = current
        .checked_add(delta)
        .ok_or(LedgerError::BalanceOverflow(land_type))?;
    if next.is_negative() {
        return Err(LedgerError::InsufficientBalance {
            land_type,
            available: current,
        });
    }
    Ok(next)
}

fn missing_balance(land_type: LandType) -> LedgerError {
    LedgerError::Backend(format!("no {} balance returned", land_type))
}

/// Persistence collaborator used by the conversion service.
///
/// Implementations own all durable state; the conversion engine never
/// reaches for them directly. Every method that moves a balance does so
/// atomically, so concurrent requests for the same user cannot lose updates.
#[async_trait]
pub trait RewardLedger: Send + Sync + fmt::Debug {
    /// All users, sorted by name.
    async fn list_users(&self) -> Result<Vec<UserProfile>, LedgerError>;

    async fn get_user(&self, user: &UserId) -> Result<UserProfile, LedgerError>;

    /// Create a user with zeroed reward rows for every land type.
    async fn create_user(&self, user: NewUser) -> Result<UserProfile, LedgerError>;

    async fn reward_balances(&self, user: &UserId) -> Result<Vec<RewardBalance>, LedgerError>;

    /// Current balance, zero when there is no row.
    async fn get_reward_balance(
        &self,
        user: &UserId,
        land_type: LandType,
    ) -> Result<Decimal, LedgerError>;

    /// Overwrite a balance, subject to the ledger's [`MissingRecordPolicy`].
    async fn set_reward_balance(
        &self,
        user: &UserId,
        land_type: LandType,
        count: Decimal,
    ) -> Result<RewardBalance, LedgerError>;

    /// Add signed deltas to several balances as one unit: every delta is
    /// applied or none is. A missing row counts as zero under
    /// `CreateOnAbsent` and fails the whole batch under `RejectOnAbsent`.
    /// Repeated land types fold together. Returns the new balances in land
    /// type order.
    ///
    /// # Errors
    /// `InsufficientBalance` if a balance would drop below zero.
    async fn adjust_reward_balances(
        &self,
        user: &UserId,
        deltas: &[(LandType, Decimal)],
    ) -> Result<Vec<RewardBalance>, LedgerError>;

    async fn adjust_reward_balance(
        &self,
        user: &UserId,
        land_type: LandType,
        delta: Decimal,
    ) -> Result<RewardBalance, LedgerError> {
        self.adjust_reward_balances(user, &[(land_type, delta)])
            .await?
            .pop()
            .ok_or_else(|| missing_balance(land_type))
    }

    /// Active squares, most recently earned first.
    async fn land_squares(&self, user: &UserId) -> Result<Vec<SquareRecord>, LedgerError>;

    /// Record `position` for the user and debit one unit of `land_type`,
    /// both or neither.
    ///
    /// # Errors
    /// `SquareOccupied` if the user already owns `position`,
    /// `InsufficientBalance` if less than one unit is available.
    async fn claim_grid_square(
        &self,
        user: &UserId,
        position: GridPosition,
        land_type: LandType,
    ) -> Result<(SquareRecord, RewardBalance), LedgerError>;

    /// Payments not yet converted, oldest first.
    async fn pending_payments(&self, user: &UserId) -> Result<Vec<PendingPayment>, LedgerError>;

    /// Mark a payment consumed and credit `units` of `land_type`, both or
    /// neither.
    ///
    /// # Errors
    /// `NotFound` unless the payment belongs to `user` and is still pending,
    /// so a payment can be consumed only once.
    async fn record_payment_conversion(
        &self,
        payment_id: &PaymentId,
        user: &UserId,
        land_type: LandType,
        units: Decimal,
    ) -> Result<RewardBalance, LedgerError>;

    /// Append an investment conversion to the audit log.
    async fn record_investment_conversion(
        &self,
        user: &UserId,
        land_type: LandType,
        amount: Decimal,
        units: Decimal,
    ) -> Result<(), LedgerError>;
}

/// Build the ledger selected by `config`.
///
/// # Errors
/// Returns an error if the SQLite database cannot be opened or seeded.
pub async fn open_ledger(config: &Config) -> Result<Arc<dyn RewardLedger>, LedgerError> {
    let policy = config.missing_record_policy;
    match &config.ledger_backend {
        LedgerBackend::Memory => {
            info!(?policy, demo = config.seed_demo_data, "using in-memory ledger");
            let ledger = if config.seed_demo_data {
                MemoryLedger::demo(policy)
            } else {
                MemoryLedger::new(policy)
            };
            Ok(Arc::new(ledger))
        }
        LedgerBackend::Sqlite { database_path } => {
            info!(?policy, path = %database_path, "using sqlite ledger");
            let pool = init_db(database_path).await?;
            let ledger = SqliteLedger::new(Repository::new(pool), policy);
            if config.seed_demo_data {
                ledger.seed(&DemoData::standard()).await?;
            }
            Ok(Arc::new(ledger))
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("square {position} is already claimed")]
    SquareOccupied { position: GridPosition },
    #[error("user {0} already exists")]
    UserExists(UserId),
    #[error("{land_type} balance of {available} is too low")]
    InsufficientBalance {
        land_type: LandType,
        available: Decimal,
    },
    #[error("{0} balance is out of range")]
    BalanceOverflow(LandType),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Backend(err.to_string())
    }
}
