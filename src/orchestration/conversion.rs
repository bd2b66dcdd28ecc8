use crate::domain::{
    Decimal, GameData, LandType, NewUser, PaymentId, PendingPayment, RewardBalance, SquareRecord,
    UserId, UserProfile, SQUARES_PER_PARCEL,
};
use crate::engine::{
    AllocationSummary, AllocationTracker, ConversionCalculator, ConversionError,
    ConversionResult, LandGrid, RateSchedule, RateTable, RoundingPolicy,
};
use crate::ledger::{LedgerError, RewardLedger};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Bonus credited to a user's reward balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusConversion {
    pub result: ConversionResult,
    pub balance: RewardBalance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConversionOutcome {
    pub payment: PendingPayment,
    pub result: ConversionResult,
    pub balance: RewardBalance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestmentReceipt {
    pub summary: AllocationSummary,
    /// Balances after crediting, one per allocated land type.
    pub balances: Vec<RewardBalance>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub square: SquareRecord,
    pub balance: RewardBalance,
}

/// Drives conversions against an injected ledger.
///
/// Employee bonuses and payments are priced by the employee schedule,
/// investments by the investor schedule. The two tables never mix.
#[derive(Debug, Clone)]
pub struct ConversionService {
    ledger: Arc<dyn RewardLedger>,
    employee_rates: RateTable,
    investor_rates: RateTable,
    calculator: ConversionCalculator,
}

impl ConversionService {
    pub fn new(ledger: Arc<dyn RewardLedger>, policy: RoundingPolicy) -> Self {
        Self::with_rates(ledger, policy, RateTable::employee(), RateTable::investor())
    }

    pub fn with_rates(
        ledger: Arc<dyn RewardLedger>,
        policy: RoundingPolicy,
        employee_rates: RateTable,
        investor_rates: RateTable,
    ) -> Self {
        Self {
            ledger,
            employee_rates,
            investor_rates,
            calculator: ConversionCalculator::new(policy),
        }
    }

    pub fn calculator(&self) -> ConversionCalculator {
        self.calculator
    }

    pub fn rates(&self, schedule: RateSchedule) -> &RateTable {
        match schedule {
            RateSchedule::Employee => &self.employee_rates,
            RateSchedule::Investor => &self.investor_rates,
        }
    }

    pub fn quote_cash(
        &self,
        schedule: RateSchedule,
        amount: Decimal,
        land_type: LandType,
    ) -> Result<ConversionResult, ServiceError> {
        Ok(self
            .calculator
            .calculate_from_cash(amount, land_type, self.rates(schedule))?)
    }

    pub fn quote_units(
        &self,
        schedule: RateSchedule,
        units: Decimal,
        land_type: LandType,
    ) -> Result<ConversionResult, ServiceError> {
        Ok(self
            .calculator
            .calculate_from_units(units, land_type, self.rates(schedule))?)
    }

    /// A fresh allocation session over the investor schedule.
    pub fn start_investment(&self, budget: Decimal) -> Result<AllocationTracker, ServiceError> {
        Ok(AllocationTracker::new(self.investor_rates.clone(), budget)?)
    }

    /// Convert a cash bonus into reward units of `land_type`.
    pub async fn convert_bonus(
        &self,
        user: &UserId,
        amount: Decimal,
        land_type: LandType,
    ) -> Result<BonusConversion, ServiceError> {
        self.ledger.get_user(user).await?;
        let result = self.employee_quote(amount, land_type)?;
        let balance = self
            .ledger
            .adjust_reward_balance(user, land_type, result.units)
            .await?;

        info!(%user, %land_type, %amount, units = %result.units, "bonus converted");
        Ok(BonusConversion { result, balance })
    }

    /// Convert one pending payment at the employee tree rate.
    ///
    /// The ledger consumes the payment and credits the balance together, so
    /// a payment converted twice at once credits only once.
    pub async fn convert_payment(
        &self,
        user: &UserId,
        payment_id: &PaymentId,
    ) -> Result<PaymentConversionOutcome, ServiceError> {
        let payment = self
            .ledger
            .pending_payments(user)
            .await?
            .into_iter()
            .find(|p| &p.id == payment_id)
            .ok_or_else(|| {
                LedgerError::NotFound(format!("pending payment {} for user {}", payment_id, user))
            })?;

        let result = self.employee_quote(payment.amount, LandType::Tree)?;
        let balance = self
            .ledger
            .record_payment_conversion(payment_id, user, LandType::Tree, result.units)
            .await?;

        info!(%user, payment = %payment_id, units = %result.units, "payment converted");
        Ok(PaymentConversionOutcome {
            payment,
            result,
            balance,
        })
    }

    /// Persist a fully allocated investment and close the session.
    ///
    /// All lines are credited in one ledger batch. The tracker only enters
    /// `Committed` once that batch landed; on error nothing was credited and
    /// it stays open to be retried or adjusted. Audit rows follow the credit
    /// and are best-effort.
    pub async fn commit_investment(
        &self,
        user: &UserId,
        tracker: &mut AllocationTracker,
    ) -> Result<InvestmentReceipt, ServiceError> {
        self.ledger.get_user(user).await?;
        let summary = tracker.prepare_commit()?;

        let credits: Vec<_> = summary
            .breakdown
            .values()
            .map(|line| (line.land_type, line.units))
            .collect();
        let balances = self.ledger.adjust_reward_balances(user, &credits).await?;

        for line in summary.breakdown.values() {
            if let Err(e) = self
                .ledger
                .record_investment_conversion(
                    user,
                    line.land_type,
                    line.investment_required,
                    line.units,
                )
                .await
            {
                warn!(%user, land_type = %line.land_type, error = %e, "investment audit log write failed, continuing");
            }
        }

        let summary = tracker.mark_committed()?;
        info!(
            %user,
            invested = %summary.total_invested,
            units = %summary.total_units,
            "investment committed"
        );
        Ok(InvestmentReceipt { summary, balances })
    }

    /// Spend one unit of `land_type` to claim the next free grid square.
    ///
    /// A square taken by a concurrent claim between reading the grid and
    /// writing it is skipped; owned squares only grow, so the grid fills up
    /// after at most one retry per square.
    pub async fn claim_reward(
        &self,
        user: &UserId,
        land_type: LandType,
    ) -> Result<ClaimOutcome, ServiceError> {
        let available = self.ledger.get_reward_balance(user, land_type).await?;
        if available < Decimal::one() {
            return Err(ServiceError::NoRewardAvailable(land_type));
        }

        for _ in 0..=SQUARES_PER_PARCEL {
            let squares = self.ledger.land_squares(user).await?;
            let position = LandGrid::from_squares(&squares)
                .next_free()
                .ok_or(ServiceError::GridFull)?;

            match self.ledger.claim_grid_square(user, position, land_type).await {
                Ok((square, balance)) => {
                    info!(%user, %land_type, %position, "reward claimed");
                    return Ok(ClaimOutcome { square, balance });
                }
                Err(LedgerError::SquareOccupied { .. }) => {
                    debug!(%user, %position, "square taken concurrently, retrying");
                }
                Err(LedgerError::InsufficientBalance { .. }) => {
                    return Err(ServiceError::NoRewardAvailable(land_type));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::GridFull)
    }

    pub async fn game_data(&self, user: &UserId) -> Result<GameData, ServiceError> {
        let (profile, squares, rewards) = futures::try_join!(
            self.ledger.get_user(user),
            self.ledger.land_squares(user),
            self.ledger.reward_balances(user),
        )?;
        let grid = LandGrid::from_squares(&squares);

        Ok(GameData {
            user_id: profile.user_id,
            user_name: profile.name,
            total_land_parcels: grid.total_parcels(),
            next_parcel_progress: grid.owned_count() % SQUARES_PER_PARCEL,
            completion_percentage: grid.completion_percentage(),
            owned_squares: squares,
            available_rewards: rewards,
            streak_days: profile.streak_days,
            total_earnings: profile.total_earnings,
        })
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, ServiceError> {
        Ok(self.ledger.list_users().await?)
    }

    pub async fn create_user(&self, user: NewUser) -> Result<UserProfile, ServiceError> {
        let profile = self.ledger.create_user(user).await?;
        info!(user = %profile.user_id, "user created");
        Ok(profile)
    }

    pub async fn pending_payments(
        &self,
        user: &UserId,
    ) -> Result<Vec<PendingPayment>, ServiceError> {
        self.ledger.get_user(user).await?;
        Ok(self.ledger.pending_payments(user).await?)
    }

    fn employee_quote(
        &self,
        amount: Decimal,
        land_type: LandType,
    ) -> Result<ConversionResult, ConversionError> {
        let rate = self.employee_rates.lookup(land_type)?;
        let result = self
            .calculator
            .calculate_from_cash(amount, land_type, &self.employee_rates)?;
        self.calculator.ensure_convertible(&result, &rate)?;
        Ok(result)
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("no {0} reward available to claim")]
    NoRewardAvailable(LandType),
    #[error("every square of the grid is already claimed")]
    GridFull,
}
