//! Wire shapes shared by the handlers. Decimals travel as canonical strings.

use crate::domain::{
    Decimal, LandType, PendingPayment, RewardBalance, SquareRecord, UserProfile,
};
use crate::engine::{AllocationSummary, ConversionResult, LandTypeRate};
use crate::error::AppError;
use serde::Serialize;
use std::str::FromStr;

pub fn parse_decimal(field: &str, value: &str) -> Result<Decimal, AppError> {
    Decimal::from_str(value)
        .map_err(|_| AppError::BadRequest(format!("{} must be a decimal number", field)))
}

pub fn parse_land_type(value: &str) -> Result<LandType, AppError> {
    LandType::from_str(value).map_err(|e| AppError::BadRequest(e.to_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionDto {
    pub land_type: LandType,
    pub investment_required: String,
    pub land_value: String,
    pub units: String,
    pub whole_units: String,
    pub fractional_units: String,
    pub remaining_value: String,
    pub remaining_cash: String,
}

impl From<ConversionResult> for ConversionDto {
    fn from(r: ConversionResult) -> Self {
        Self {
            land_type: r.land_type,
            investment_required: r.investment_required.to_canonical_string(),
            land_value: r.land_value.to_canonical_string(),
            units: r.units.to_canonical_string(),
            whole_units: r.whole_units.to_canonical_string(),
            fractional_units: r.fractional_units.to_canonical_string(),
            remaining_value: r.remaining_value.to_canonical_string(),
            remaining_cash: r.remaining_cash.to_canonical_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateDto {
    pub land_type: LandType,
    pub display_name: &'static str,
    pub multiplier: String,
    pub unit_value: String,
    pub min_units: u32,
    pub min_ticket: String,
    pub unit_price: String,
}

impl From<&LandTypeRate> for RateDto {
    fn from(rate: &LandTypeRate) -> Self {
        Self {
            land_type: rate.land_type(),
            display_name: rate.land_type().display_name(),
            multiplier: rate.multiplier().to_canonical_string(),
            unit_value: rate.unit_value().to_canonical_string(),
            min_units: rate.min_units(),
            min_ticket: rate.min_ticket().to_canonical_string(),
            unit_price: rate.unit_price().to_canonical_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardBalanceDto {
    pub land_type: LandType,
    pub count: String,
}

impl From<RewardBalance> for RewardBalanceDto {
    fn from(b: RewardBalance) -> Self {
        Self {
            land_type: b.land_type,
            count: b.count.to_canonical_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SquareDto {
    pub id: String,
    pub x: u8,
    pub y: u8,
    pub land_type: LandType,
    pub earned_date: String,
}

impl From<SquareRecord> for SquareDto {
    fn from(s: SquareRecord) -> Self {
        Self {
            id: s.id,
            x: s.position.x(),
            y: s.position.y(),
            land_type: s.land_type,
            earned_date: s.earned_date.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub streak_days: u32,
    pub total_earnings: String,
}

impl From<UserProfile> for UserDto {
    fn from(u: UserProfile) -> Self {
        Self {
            user_id: u.user_id.0,
            name: u.name,
            email: u.email,
            streak_days: u.streak_days,
            total_earnings: u.total_earnings.to_canonical_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDto {
    pub id: String,
    pub amount: String,
    pub description: String,
    pub payment_type: String,
    pub payment_date: String,
}

impl From<PendingPayment> for PaymentDto {
    fn from(p: PendingPayment) -> Self {
        Self {
            id: p.id.0,
            amount: p.amount.to_canonical_string(),
            description: p.description,
            payment_type: p.payment_type,
            payment_date: p.payment_date.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationLineDto {
    pub land_type: LandType,
    pub units: String,
    pub investment_required: String,
    pub land_value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSummaryDto {
    pub breakdown: Vec<AllocationLineDto>,
    pub total_invested: String,
    pub total_land_value: String,
    pub total_units: String,
}

impl From<AllocationSummary> for AllocationSummaryDto {
    fn from(s: AllocationSummary) -> Self {
        Self {
            breakdown: s
                .breakdown
                .into_values()
                .map(|line| AllocationLineDto {
                    land_type: line.land_type,
                    units: line.units.to_canonical_string(),
                    investment_required: line.investment_required.to_canonical_string(),
                    land_value: line.land_value.to_canonical_string(),
                })
                .collect(),
            total_invested: s.total_invested.to_canonical_string(),
            total_land_value: s.total_land_value.to_canonical_string(),
            total_units: s.total_units.to_canonical_string(),
        }
    }
}
