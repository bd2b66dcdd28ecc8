use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::dto::{parse_decimal, parse_land_type, ConversionDto, RateDto};
use crate::api::AppState;
use crate::engine::{RateSchedule, RoundingPolicy};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatesQuery {
    pub schedule: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDto {
    pub schedule: String,
    pub rates: Vec<RateDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatesResponse {
    pub rounding_policy: RoundingPolicy,
    pub schedules: Vec<ScheduleDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashQuoteQuery {
    pub schedule: Option<String>,
    pub amount: String,
    pub land_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitsQuoteQuery {
    pub schedule: Option<String>,
    pub units: String,
    pub land_type: String,
}

fn parse_schedule(value: Option<&str>) -> Result<RateSchedule, AppError> {
    value
        .unwrap_or("employee")
        .parse::<RateSchedule>()
        .map_err(AppError::BadRequest)
}

/// Both schedules unless `schedule` narrows it down.
pub async fn get_rates(
    Query(params): Query<RatesQuery>,
    State(state): State<AppState>,
) -> Result<Json<RatesResponse>, AppError> {
    let schedules = match params.schedule.as_deref() {
        Some(s) => vec![parse_schedule(Some(s))?],
        None => vec![RateSchedule::Employee, RateSchedule::Investor],
    };

    let schedules = schedules
        .into_iter()
        .map(|schedule| ScheduleDto {
            schedule: schedule.to_string(),
            rates: state
                .service
                .rates(schedule)
                .rates()
                .map(RateDto::from)
                .collect(),
        })
        .collect();

    Ok(Json(RatesResponse {
        rounding_policy: state.service.calculator().policy(),
        schedules,
    }))
}

pub async fn quote_cash(
    Query(params): Query<CashQuoteQuery>,
    State(state): State<AppState>,
) -> Result<Json<ConversionDto>, AppError> {
    let schedule = parse_schedule(params.schedule.as_deref())?;
    let amount = parse_decimal("amount", &params.amount)?;
    let land_type = parse_land_type(&params.land_type)?;

    let result = state.service.quote_cash(schedule, amount, land_type)?;
    Ok(Json(result.into()))
}

pub async fn quote_units(
    Query(params): Query<UnitsQuoteQuery>,
    State(state): State<AppState>,
) -> Result<Json<ConversionDto>, AppError> {
    let schedule = parse_schedule(params.schedule.as_deref())?;
    let units = parse_decimal("units", &params.units)?;
    let land_type = parse_land_type(&params.land_type)?;

    let result = state.service.quote_units(schedule, units, land_type)?;
    Ok(Json(result.into()))
}
