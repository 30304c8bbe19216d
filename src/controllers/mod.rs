pub mod health;
pub mod movies;
pub mod showings;
pub mod tickets;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use validator::ValidationErrors;

use crate::error::{BookingError, CatalogError, StoreError};
use crate::models::SeatNumber;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(movies::routes())
        .merge(showings::routes())
        .merge(tickets::routes())
}

/// Единый формат ошибки: клиент различает исходы по `error`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    error: &'static str,
    message: String,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    seats: Option<Vec<SeatNumber>>,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error,
            message: message.into(),
            retryable: false,
            seats: None,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        let status = match &err {
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::ShowingNotFound(_) => StatusCode::NOT_FOUND,
            BookingError::CapacityExceeded { .. } | BookingError::SeatConflict { .. } => {
                StatusCode::CONFLICT
            }
            BookingError::PersistenceFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!("booking failed: {:?}", err);
        }

        let seats = match &err {
            BookingError::SeatConflict { seats } => Some(seats.clone()),
            _ => None,
        };
        ApiError {
            status,
            error: err.code(),
            retryable: err.is_retryable(),
            message: err.to_string(),
            seats,
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            e @ CatalogError::AlreadyExists { .. } => {
                Self::new(StatusCode::CONFLICT, "ALREADY_EXISTS", e.to_string())
            }
            e @ CatalogError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
            CatalogError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("storage error: {:?}", err);
        let mut api = Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "PERSISTENCE_FAILURE",
            "Storage is temporarily unavailable",
        );
        api.retryable = true;
        api
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
    }
}
