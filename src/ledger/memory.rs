//! In-memory ledger for demos and tests.

use super::{
    apply_delta, missing_balance, DemoData, LedgerError, MissingRecordPolicy, RewardLedger,
};
use crate::domain::{
    Decimal, GridPosition, InvestmentConversion, LandType, NewUser, PaymentConversion, PaymentId,
    PendingPayment, RewardBalance, SquareRecord, UserId, UserProfile,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<UserId, UserProfile>,
    rewards: BTreeMap<UserId, BTreeMap<LandType, Decimal>>,
    squares: BTreeMap<UserId, Vec<SquareRecord>>,
    payments: BTreeMap<PaymentId, PendingPayment>,
    payment_conversions: BTreeMap<PaymentId, PaymentConversion>,
    investment_log: Vec<InvestmentConversion>,
}

impl MemoryState {
    fn require_user(&self, user: &UserId) -> Result<&UserProfile, LedgerError> {
        self.users
            .get(user)
            .ok_or_else(|| LedgerError::NotFound(format!("user {}", user)))
    }

    /// Stage every delta first and write only when all of them pass.
    fn adjust(
        &mut self,
        user: &UserId,
        deltas: &[(LandType, Decimal)],
        missing_records: MissingRecordPolicy,
    ) -> Result<Vec<RewardBalance>, LedgerError> {
        self.require_user(user)?;
        let rows = self.rewards.entry(user.clone()).or_default();
        let mut staged: BTreeMap<LandType, Decimal> = BTreeMap::new();
        for (land_type, delta) in deltas {
            let current = match staged.get(land_type).or_else(|| rows.get(land_type)) {
                Some(count) => *count,
                None => missing_records.absent_balance(user, *land_type)?,
            };
            staged.insert(*land_type, apply_delta(*land_type, current, *delta)?);
        }
        rows.extend(staged.iter().map(|(t, c)| (*t, *c)));
        Ok(staged
            .into_iter()
            .map(|(land_type, count)| RewardBalance { land_type, count })
            .collect())
    }
}

/// Ledger backed by process memory. Seed it with the builder methods.
#[derive(Debug)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
    missing_records: MissingRecordPolicy,
    investment_log_enabled: bool,
}

impl MemoryLedger {
    pub fn new(missing_records: MissingRecordPolicy) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            missing_records,
            investment_log_enabled: true,
        }
    }

    /// Seeded with [`DemoData::standard`].
    pub fn demo(missing_records: MissingRecordPolicy) -> Self {
        let demo = DemoData::standard();
        let mut ledger = Self::new(missing_records);
        for user in demo.users {
            ledger = ledger.with_user(user);
        }
        for (user, land_type, count) in demo.rewards {
            ledger = ledger.with_reward(&user, land_type, count);
        }
        for (user, square) in demo.squares {
            ledger = ledger.with_square(&user, square.position, square.land_type, square.earned_date);
        }
        for payment in demo.payments {
            ledger = ledger.with_payment(payment);
        }
        ledger
    }

    pub fn with_user(mut self, profile: UserProfile) -> Self {
        let state = self.state.get_mut();
        state.users.insert(profile.user_id.clone(), profile);
        self
    }

    pub fn with_reward(mut self, user: &UserId, land_type: LandType, count: Decimal) -> Self {
        self.state
            .get_mut()
            .rewards
            .entry(user.clone())
            .or_default()
            .insert(land_type, count);
        self
    }

    pub fn with_square(
        mut self,
        user: &UserId,
        position: GridPosition,
        land_type: LandType,
        earned_date: NaiveDate,
    ) -> Self {
        self.state
            .get_mut()
            .squares
            .entry(user.clone())
            .or_default()
            .push(SquareRecord {
                id: SquareRecord::square_id(user, position),
                position,
                land_type,
                earned_date,
            });
        self
    }

    pub fn with_payment(mut self, payment: PendingPayment) -> Self {
        self.state
            .get_mut()
            .payments
            .insert(payment.id.clone(), payment);
        self
    }

    /// Behave as if the investment audit table does not exist.
    pub fn without_investment_log(mut self) -> Self {
        self.investment_log_enabled = false;
        self
    }

    pub async fn investment_log(&self) -> Vec<InvestmentConversion> {
        self.state.lock().await.investment_log.clone()
    }

    pub async fn payment_conversion(&self, payment_id: &PaymentId) -> Option<PaymentConversion> {
        self.state
            .lock()
            .await
            .payment_conversions
            .get(payment_id)
            .cloned()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(MissingRecordPolicy::default())
    }
}

#[async_trait]
impl RewardLedger for MemoryLedger {
    async fn list_users(&self) -> Result<Vec<UserProfile>, LedgerError> {
        let state = self.state.lock().await;
        let mut users: Vec<_> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn get_user(&self, user: &UserId) -> Result<UserProfile, LedgerError> {
        let state = self.state.lock().await;
        state.require_user(user).cloned()
    }

    async fn create_user(&self, user: NewUser) -> Result<UserProfile, LedgerError> {
        let mut state = self.state.lock().await;
        if state.users.contains_key(&user.user_id) {
            return Err(LedgerError::UserExists(user.user_id));
        }
        let profile = UserProfile {
            user_id: user.user_id.clone(),
            name: user.name,
            email: user.email,
            streak_days: 0,
            total_earnings: Decimal::zero(),
        };
        state.users.insert(user.user_id.clone(), profile.clone());
        state.rewards.insert(
            user.user_id.clone(),
            LandType::ALL
                .into_iter()
                .map(|t| (t, Decimal::zero()))
                .collect(),
        );
        state.squares.insert(user.user_id, Vec::new());
        Ok(profile)
    }

    async fn reward_balances(&self, user: &UserId) -> Result<Vec<RewardBalance>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .rewards
            .get(user)
            .map(|rows| {
                rows.iter()
                    .map(|(land_type, count)| RewardBalance {
                        land_type: *land_type,
                        count: *count,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_reward_balance(
        &self,
        user: &UserId,
        land_type: LandType,
    ) -> Result<Decimal, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .rewards
            .get(user)
            .and_then(|rows| rows.get(&land_type))
            .copied()
            .unwrap_or_default())
    }

    async fn set_reward_balance(
        &self,
        user: &UserId,
        land_type: LandType,
        count: Decimal,
    ) -> Result<RewardBalance, LedgerError> {
        let mut state = self.state.lock().await;
        state.require_user(user)?;
        let rows = state.rewards.entry(user.clone()).or_default();
        match rows.get_mut(&land_type) {
            Some(existing) => *existing = count,
            None => match self.missing_records {
                MissingRecordPolicy::CreateOnAbsent => {
                    rows.insert(land_type, count);
                }
                MissingRecordPolicy::RejectOnAbsent => {
                    return Err(LedgerError::NotFound(format!(
                        "{} reward row for user {}",
                        land_type, user
                    )));
                }
            },
        }
        Ok(RewardBalance { land_type, count })
    }

    async fn land_squares(&self, user: &UserId) -> Result<Vec<SquareRecord>, LedgerError> {
        let state = self.state.lock().await;
        let mut squares: Vec<_> = state
            .squares
            .get(user)
            .map(|s| s.iter().rev().cloned().collect())
            .unwrap_or_default();
        squares.sort_by(|a: &SquareRecord, b| b.earned_date.cmp(&a.earned_date));
        Ok(squares)
    }

    async fn adjust_reward_balances(
        &self,
        user: &UserId,
        deltas: &[(LandType, Decimal)],
    ) -> Result<Vec<RewardBalance>, LedgerError> {
        let mut state = self.state.lock().await;
        state.adjust(user, deltas, self.missing_records)
    }

    async fn claim_grid_square(
        &self,
        user: &UserId,
        position: GridPosition,
        land_type: LandType,
    ) -> Result<(SquareRecord, RewardBalance), LedgerError> {
        let mut state = self.state.lock().await;
        state.require_user(user)?;
        if state
            .squares
            .get(user)
            .is_some_and(|squares| squares.iter().any(|s| s.position == position))
        {
            return Err(LedgerError::SquareOccupied { position });
        }
        let balance = state
            .adjust(user, &[(land_type, Decimal::from_i64(-1))], self.missing_records)?
            .pop()
            .ok_or_else(|| missing_balance(land_type))?;

        let record = SquareRecord {
            id: SquareRecord::square_id(user, position),
            position,
            land_type,
            earned_date: Utc::now().date_naive(),
        };
        state
            .squares
            .entry(user.clone())
            .or_default()
            .push(record.clone());
        Ok((record, balance))
    }

    async fn pending_payments(&self, user: &UserId) -> Result<Vec<PendingPayment>, LedgerError> {
        let state = self.state.lock().await;
        let mut payments: Vec<_> = state
            .payments
            .values()
            .filter(|p| &p.user_id == user && !state.payment_conversions.contains_key(&p.id))
            .cloned()
            .collect();
        payments.sort_by(|a, b| {
            a.payment_date
                .cmp(&b.payment_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(payments)
    }

    async fn record_payment_conversion(
        &self,
        payment_id: &PaymentId,
        user: &UserId,
        land_type: LandType,
        units: Decimal,
    ) -> Result<RewardBalance, LedgerError> {
        let mut state = self.state.lock().await;
        let pending = state
            .payments
            .get(payment_id)
            .is_some_and(|p| &p.user_id == user)
            && !state.payment_conversions.contains_key(payment_id);
        if !pending {
            return Err(LedgerError::NotFound(format!(
                "pending payment {} for user {}",
                payment_id, user
            )));
        }
        let balance = state
            .adjust(user, &[(land_type, units)], self.missing_records)?
            .pop()
            .ok_or_else(|| missing_balance(land_type))?;
        state.payment_conversions.insert(
            payment_id.clone(),
            PaymentConversion {
                payment_id: payment_id.clone(),
                user_id: user.clone(),
                land_type,
                units,
                converted_at: Utc::now(),
            },
        );
        Ok(balance)
    }

    async fn record_investment_conversion(
        &self,
        user: &UserId,
        land_type: LandType,
        amount: Decimal,
        units: Decimal,
    ) -> Result<(), LedgerError> {
        if !self.investment_log_enabled {
            return Err(LedgerError::Unavailable(
                "investment conversions table".to_string(),
            ));
        }
        let mut state = self.state.lock().await;
        state.investment_log.push(InvestmentConversion {
            user_id: user.clone(),
            land_type,
            amount,
            units,
            recorded_at: Utc::now(),
        });
        Ok(())
    }
}
