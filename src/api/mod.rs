pub mod conversions;
pub mod dto;
pub mod health;
pub mod quotes;
pub mod users;

use crate::config::Config;
use crate::orchestration::ConversionService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConversionService>,
    pub config: Config,
}

impl AppState {
    pub fn new(service: Arc<ConversionService>, config: Config) -> Self {
        Self { service, config }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/rates", get(quotes::get_rates))
        .route("/v1/quote/cash", get(quotes::quote_cash))
        .route("/v1/quote/units", get(quotes::quote_units))
        .route("/v1/users", get(users::list_users).post(users::create_user))
        .route("/v1/users/:user_id/game", get(users::get_game_data))
        .route("/v1/users/:user_id/payments", get(users::get_pending_payments))
        .route(
            "/v1/users/:user_id/bonus/convert",
            post(conversions::convert_bonus),
        )
        .route(
            "/v1/users/:user_id/payments/:payment_id/convert",
            post(conversions::convert_payment),
        )
        .route(
            "/v1/users/:user_id/investments/convert",
            post(conversions::convert_investment),
        )
        .route(
            "/v1/users/:user_id/rewards/:land_type/claim",
            post(conversions::claim_reward),
        )
        .layer(cors)
        .with_state(state)
}
