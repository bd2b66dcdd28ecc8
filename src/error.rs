use crate::engine::ConversionError;
use crate::ledger::LedgerError;
use crate::orchestration::ServiceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let msg = err.to_string();
        match err {
            ServiceError::Conversion(ConversionError::AlreadyCommitted) => AppError::Conflict(msg),
            ServiceError::Conversion(_) => AppError::BadRequest(msg),
            ServiceError::NoRewardAvailable(_) => AppError::BadRequest(msg),
            ServiceError::GridFull => AppError::Conflict(msg),
            ServiceError::Ledger(LedgerError::NotFound(_)) => AppError::NotFound(msg),
            ServiceError::Ledger(LedgerError::SquareOccupied { .. })
            | ServiceError::Ledger(LedgerError::UserExists(_))
            | ServiceError::Ledger(LedgerError::InsufficientBalance { .. }) => {
                AppError::Conflict(msg)
            }
            ServiceError::Ledger(LedgerError::Grid(_))
            | ServiceError::Ledger(LedgerError::BalanceOverflow(_)) => AppError::BadRequest(msg),
            ServiceError::Ledger(LedgerError::Unavailable(_))
            | ServiceError::Ledger(LedgerError::Backend(_)) => AppError::Internal(msg),
        }
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        ServiceError::from(err).into()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GridPosition, LandType};

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_service_error_status_mapping() {
        assert_eq!(
            status_of(ServiceError::Conversion(ConversionError::NothingAllocated)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::Conversion(ConversionError::AlreadyCommitted)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ServiceError::Ledger(LedgerError::NotFound("user x".into()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ServiceError::Ledger(LedgerError::SquareOccupied {
                position: GridPosition::new(0, 0).unwrap()
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ServiceError::NoRewardAvailable(LandType::Tree)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::Ledger(LedgerError::BalanceOverflow(LandType::Tree))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::Ledger(LedgerError::Backend("disk".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
