use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::dto::{PaymentDto, RewardBalanceDto, SquareDto, UserDto};
use crate::api::AppState;
use crate::domain::{Decimal, NewUser, UserId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersResponse {
    pub users: Vec<UserDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    pub user_id: String,
    pub user_name: String,
    pub total_land_parcels: usize,
    pub owned_squares: Vec<SquareDto>,
    pub available_rewards: Vec<RewardBalanceDto>,
    pub next_parcel_progress: usize,
    pub completion_percentage: u32,
    pub streak_days: u32,
    pub total_earnings: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentsResponse {
    pub user_id: String,
    pub total_pending: String,
    pub payments: Vec<PaymentDto>,
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersResponse>, AppError> {
    let users = state.service.list_users().await?;
    Ok(Json(UsersResponse {
        users: users.into_iter().map(UserDto::from).collect(),
    }))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserDto>), AppError> {
    let user_id = body.user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::BadRequest("userId must not be empty".into()));
    }
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }

    let profile = state
        .service
        .create_user(NewUser {
            user_id: UserId::new(user_id),
            name: body.name.trim().to_string(),
            email: body.email.trim().to_string(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(profile.into())))
}

pub async fn get_game_data(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<GameResponse>, AppError> {
    let game = state.service.game_data(&UserId::new(user_id)).await?;

    Ok(Json(GameResponse {
        user_id: game.user_id.0,
        user_name: game.user_name,
        total_land_parcels: game.total_land_parcels,
        owned_squares: game.owned_squares.into_iter().map(SquareDto::from).collect(),
        available_rewards: game
            .available_rewards
            .into_iter()
            .map(RewardBalanceDto::from)
            .collect(),
        next_parcel_progress: game.next_parcel_progress,
        completion_percentage: game.completion_percentage,
        streak_days: game.streak_days,
        total_earnings: game.total_earnings.to_canonical_string(),
    }))
}

pub async fn get_pending_payments(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PaymentsResponse>, AppError> {
    let user = UserId::new(user_id);
    let payments = state.service.pending_payments(&user).await?;
    let total_pending = payments.iter().map(|p| p.amount).sum::<Decimal>();

    Ok(Json(PaymentsResponse {
        user_id: user.0,
        total_pending: total_pending.to_canonical_string(),
        payments: payments.into_iter().map(PaymentDto::from).collect(),
    }))
}
