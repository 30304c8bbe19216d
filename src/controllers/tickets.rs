//! Бронирование и билеты пользователя.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::ApiError;
use crate::middleware::AuthUser;
use crate::models::{BookingRequest, SeatNumber};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets/book", post(book_tickets))
        .route("/tickets/mine", get(get_my_tickets))
        .route("/tickets/user/{user_id}", get(get_tickets_by_user))
}

// POST /api/tickets/book
#[derive(Debug, Deserialize, Validate)]
struct BookTicketsRequest {
    showing_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    seat_numbers: Vec<SeatNumber>,
    /// Если не указано, берётся число мест.
    number_of_tickets: Option<usize>,
}

async fn book_tickets(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<BookTicketsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    tracing::info!("Booking tickets for showing {} by {}", req.showing_id, user.user_id);

    let number_of_tickets = req.number_of_tickets.unwrap_or(req.seat_numbers.len());
    let request = BookingRequest {
        showing_id: req.showing_id,
        user_id: user.user_id,
        seat_numbers: req.seat_numbers,
        number_of_tickets,
    };

    let ticket = state.booking.coordinator.book(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Booked Successfully", "ticket": ticket })),
    ))
}

// GET /api/tickets/mine
async fn get_my_tickets(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let tickets = state.booking.tickets.tickets_by_user(&user.user_id).await?;
    Ok((StatusCode::OK, Json(tickets)))
}

// GET /api/tickets/user/{user_id}
async fn get_tickets_by_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !user.can_view_tickets_of(&user_id) {
        return Err(ApiError::forbidden("Tickets of other users are not visible"));
    }
    let tickets = state.booking.tickets.tickets_by_user(&user_id).await?;
    Ok((StatusCode::OK, Json(tickets)))
}
