//! Records owned by the reward ledger.

use crate::domain::{Decimal, GridPosition, LandType, PaymentId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An employee or investor known to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub streak_days: u32,
    pub total_earnings: Decimal,
}

/// Input for creating a user; streak and earnings start at zero.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

/// Accumulated, possibly fractional, reward units of one land type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardBalance {
    pub land_type: LandType,
    pub count: Decimal,
}

/// A claimed square on a user's grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquareRecord {
    pub id: String,
    pub position: GridPosition,
    pub land_type: LandType,
    pub earned_date: NaiveDate,
}

impl SquareRecord {
    /// Records are keyed `<user>_<x>_<y>`.
    pub fn square_id(user: &UserId, position: GridPosition) -> String {
        format!("{}_{}_{}", user, position.x(), position.y())
    }
}

/// A cash payment waiting to be converted into land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPayment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub description: String,
    pub payment_type: String,
    pub payment_date: NaiveDate,
}

/// Audit trail entry written when a payment is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConversion {
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub land_type: LandType,
    pub units: Decimal,
    pub converted_at: DateTime<Utc>,
}

/// Audit log entry for one land type of a committed investment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentConversion {
    pub user_id: UserId,
    pub land_type: LandType,
    pub amount: Decimal,
    pub units: Decimal,
    pub recorded_at: DateTime<Utc>,
}

/// Snapshot of everything the game screen shows for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameData {
    pub user_id: UserId,
    pub user_name: String,
    pub total_land_parcels: usize,
    pub owned_squares: Vec<SquareRecord>,
    pub available_rewards: Vec<RewardBalance>,
    pub next_parcel_progress: usize,
    pub completion_percentage: u32,
    pub streak_days: u32,
    pub total_earnings: Decimal,
}
