//! Доступность и статус сеанса.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::ApiError;
use crate::middleware::AuthUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/showings/{showing_id}/availability", get(get_availability))
        .route("/showings/{showing_id}/status", get(get_status))
        .route("/showings/{showing_id}/booking-info", get(get_booking_info))
}

// GET /api/showings/{showing_id}/availability
async fn get_availability(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(showing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let available = state.booking.availability.available_count(showing_id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "showing_id": showing_id, "available": available })),
    ))
}

// GET /api/showings/{showing_id}/status
async fn get_status(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(showing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.booking.availability.status(showing_id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "showing_id": showing_id, "status": status })),
    ))
}

// GET /api/showings/{showing_id}/booking-info
async fn get_booking_info(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(showing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let info = state.booking.availability.booking_info(showing_id).await?;
    Ok((StatusCode::OK, Json(info)))
}
