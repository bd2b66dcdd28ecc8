use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::dto::{
    parse_decimal, parse_land_type, AllocationSummaryDto, ConversionDto, PaymentDto,
    RewardBalanceDto, SquareDto,
};
use crate::api::AppState;
use crate::domain::{PaymentId, UserId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusRequest {
    pub amount: String,
    pub land_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusResponse {
    pub conversion: ConversionDto,
    pub balance: RewardBalanceDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConversionResponse {
    pub payment: PaymentDto,
    pub conversion: ConversionDto,
    pub balance: RewardBalanceDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRequest {
    pub land_type: String,
    pub units: String,
}

/// `allocations` are applied in order, then `quickFill` spends what is left.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentRequest {
    pub budget: String,
    #[serde(default)]
    pub allocations: Vec<AllocationRequest>,
    pub quick_fill: Option<String>,
    /// The investor accepted the risk disclaimer shown before confirming.
    #[serde(default)]
    pub accepted_disclaimer: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentResponse {
    pub budget: String,
    pub summary: AllocationSummaryDto,
    pub balances: Vec<RewardBalanceDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub square: SquareDto,
    pub balance: RewardBalanceDto,
}

pub async fn convert_bonus(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<BonusRequest>,
) -> Result<Json<BonusResponse>, AppError> {
    let amount = parse_decimal("amount", &body.amount)?;
    let land_type = parse_land_type(&body.land_type)?;

    let outcome = state
        .service
        .convert_bonus(&UserId::new(user_id), amount, land_type)
        .await?;

    Ok(Json(BonusResponse {
        conversion: outcome.result.into(),
        balance: outcome.balance.into(),
    }))
}

pub async fn convert_payment(
    Path((user_id, payment_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<PaymentConversionResponse>, AppError> {
    let outcome = state
        .service
        .convert_payment(&UserId::new(user_id), &PaymentId::new(payment_id))
        .await?;

    Ok(Json(PaymentConversionResponse {
        payment: outcome.payment.into(),
        conversion: outcome.result.into(),
        balance: outcome.balance.into(),
    }))
}

/// One request is one allocation session: build, validate, commit.
pub async fn convert_investment(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<InvestmentRequest>,
) -> Result<Json<InvestmentResponse>, AppError> {
    let budget = parse_decimal("budget", &body.budget)?;
    let mut tracker = state.service.start_investment(budget)?;

    for allocation in &body.allocations {
        let land_type = parse_land_type(&allocation.land_type)?;
        let units = parse_decimal("units", &allocation.units)?;
        tracker.set_units(land_type, units)?;
    }
    if let Some(quick_fill) = body.quick_fill.as_deref() {
        tracker.quick_fill_remaining(parse_land_type(quick_fill)?)?;
    }

    if !body.accepted_disclaimer {
        return Err(AppError::BadRequest(
            "the investment disclaimer must be accepted".to_string(),
        ));
    }

    let receipt = state
        .service
        .commit_investment(&UserId::new(user_id), &mut tracker)
        .await?;

    Ok(Json(InvestmentResponse {
        budget: budget.to_canonical_string(),
        summary: receipt.summary.into(),
        balances: receipt.balances.into_iter().map(RewardBalanceDto::from).collect(),
    }))
}

pub async fn claim_reward(
    Path((user_id, land_type)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<ClaimResponse>, AppError> {
    let land_type = parse_land_type(&land_type)?;
    let outcome = state
        .service
        .claim_reward(&UserId::new(user_id), land_type)
        .await?;

    Ok(Json(ClaimResponse {
        square: outcome.square.into(),
        balance: outcome.balance.into(),
    }))
}
