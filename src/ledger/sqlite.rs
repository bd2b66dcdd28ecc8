//! Ledger persisted in SQLite through the [`Repository`].

use super::{
    apply_delta, missing_balance, DemoData, LedgerError, MissingRecordPolicy, RewardLedger,
};
use crate::db::Repository;
use crate::domain::{
    Decimal, GridPosition, LandType, NewUser, PaymentId, PendingPayment, RewardBalance,
    SquareRecord, UserId, UserProfile,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{Sqlite, SqliteConnection};
use sqlx::Transaction;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SqliteLedger {
    repo: Repository,
    missing_records: MissingRecordPolicy,
}

impl SqliteLedger {
    pub fn new(repo: Repository, missing_records: MissingRecordPolicy) -> Self {
        Self {
            repo,
            missing_records,
        }
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Load demo fixtures. Existing rows are kept, so this is safe on restart.
    ///
    /// # Errors
    /// Returns an error if any insert fails.
    pub async fn seed(&self, demo: &DemoData) -> Result<(), LedgerError> {
        for user in &demo.users {
            if self.repo.query_user(&user.user_id).await?.is_none() {
                self.repo.upsert_user(user).await?;
            }
        }
        for (user, land_type, count) in &demo.rewards {
            if self.repo.query_reward(user, *land_type).await?.is_none() {
                self.repo.upsert_reward(user, *land_type, *count).await?;
            }
        }
        for (user, square) in &demo.squares {
            self.repo.insert_square(user, square).await?;
        }
        for payment in &demo.payments {
            self.repo.insert_payment(payment).await?;
        }
        info!(users = demo.users.len(), "demo data seeded");
        Ok(())
    }

    async fn require_user(&self, user: &UserId) -> Result<UserProfile, LedgerError> {
        self.repo
            .query_user(user)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("user {}", user)))
    }

    /// Write transaction for `user`; dropping it without commit rolls back.
    async fn begin(&self, user: &UserId) -> Result<Transaction<'static, Sqlite>, LedgerError> {
        self.repo
            .begin_for_user(user)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("user {}", user)))
    }

    /// Stage every delta against the rows read on `conn`, then write them.
    async fn adjust_on(
        &self,
        conn: &mut SqliteConnection,
        user: &UserId,
        deltas: &[(LandType, Decimal)],
    ) -> Result<Vec<RewardBalance>, LedgerError> {
        let mut staged: BTreeMap<LandType, Decimal> = BTreeMap::new();
        for (land_type, delta) in deltas {
            let current = match staged.get(land_type) {
                Some(count) => *count,
                None => match Repository::fetch_reward(conn, user, *land_type).await? {
                    Some(count) => count,
                    None => self.missing_records.absent_balance(user, *land_type)?,
                },
            };
            staged.insert(*land_type, apply_delta(*land_type, current, *delta)?);
        }
        for (land_type, count) in &staged {
            Repository::write_reward(conn, user, *land_type, *count).await?;
        }
        Ok(staged
            .into_iter()
            .map(|(land_type, count)| RewardBalance { land_type, count })
            .collect())
    }
}

#[async_trait]
impl RewardLedger for SqliteLedger {
    async fn list_users(&self) -> Result<Vec<UserProfile>, LedgerError> {
        Ok(self.repo.query_users().await?)
    }

    async fn get_user(&self, user: &UserId) -> Result<UserProfile, LedgerError> {
        self.require_user(user).await
    }

    async fn create_user(&self, user: NewUser) -> Result<UserProfile, LedgerError> {
        self.repo
            .insert_user(&user)
            .await?
            .ok_or(LedgerError::UserExists(user.user_id))
    }

    async fn reward_balances(&self, user: &UserId) -> Result<Vec<RewardBalance>, LedgerError> {
        Ok(self.repo.query_rewards(user).await?)
    }

    async fn get_reward_balance(
        &self,
        user: &UserId,
        land_type: LandType,
    ) -> Result<Decimal, LedgerError> {
        Ok(self
            .repo
            .query_reward(user, land_type)
            .await?
            .unwrap_or_default())
    }

    async fn set_reward_balance(
        &self,
        user: &UserId,
        land_type: LandType,
        count: Decimal,
    ) -> Result<RewardBalance, LedgerError> {
        self.require_user(user).await?;
        if !self.repo.update_reward(user, land_type, count).await? {
            match self.missing_records {
                MissingRecordPolicy::CreateOnAbsent => {
                    self.repo.upsert_reward(user, land_type, count).await?;
                }
                MissingRecordPolicy::RejectOnAbsent => {
                    return Err(LedgerError::NotFound(format!(
                        "{} reward row for user {}",
                        land_type, user
                    )));
                }
            }
        }
        Ok(RewardBalance { land_type, count })
    }

    async fn land_squares(&self, user: &UserId) -> Result<Vec<SquareRecord>, LedgerError> {
        Ok(self.repo.query_squares(user).await?)
    }

    async fn adjust_reward_balances(
        &self,
        user: &UserId,
        deltas: &[(LandType, Decimal)],
    ) -> Result<Vec<RewardBalance>, LedgerError> {
        let mut tx = self.begin(user).await?;
        let balances = self.adjust_on(&mut tx, user, deltas).await?;
        tx.commit().await?;
        debug!(%user, lines = balances.len(), "balances adjusted");
        Ok(balances)
    }

    async fn claim_grid_square(
        &self,
        user: &UserId,
        position: GridPosition,
        land_type: LandType,
    ) -> Result<(SquareRecord, RewardBalance), LedgerError> {
        let mut tx = self.begin(user).await?;
        let record = SquareRecord {
            id: SquareRecord::square_id(user, position),
            position,
            land_type,
            earned_date: Utc::now().date_naive(),
        };
        if !Repository::write_square(&mut tx, user, &record).await? {
            return Err(LedgerError::SquareOccupied { position });
        }
        let balance = self
            .adjust_on(&mut tx, user, &[(land_type, Decimal::from_i64(-1))])
            .await?
            .pop()
            .ok_or_else(|| missing_balance(land_type))?;
        tx.commit().await?;
        Ok((record, balance))
    }

    async fn pending_payments(&self, user: &UserId) -> Result<Vec<PendingPayment>, LedgerError> {
        Ok(self.repo.query_pending_payments(user).await?)
    }

    async fn record_payment_conversion(
        &self,
        payment_id: &PaymentId,
        user: &UserId,
        land_type: LandType,
        units: Decimal,
    ) -> Result<RewardBalance, LedgerError> {
        let mut tx = self.begin(user).await?;
        if !Repository::mark_payment_converted(&mut tx, payment_id, user, land_type, units).await? {
            return Err(LedgerError::NotFound(format!(
                "pending payment {} for user {}",
                payment_id, user
            )));
        }
        let balance = self
            .adjust_on(&mut tx, user, &[(land_type, units)])
            .await?
            .pop()
            .ok_or_else(|| missing_balance(land_type))?;
        tx.commit().await?;
        Ok(balance)
    }

    async fn record_investment_conversion(
        &self,
        user: &UserId,
        land_type: LandType,
        amount: Decimal,
        units: Decimal,
    ) -> Result<(), LedgerError> {
        self.repo
            .insert_investment_conversion(user, land_type, amount, units)
            .await
            .map_err(|e| LedgerError::Unavailable(format!("investment conversions: {}", e)))
    }
}
