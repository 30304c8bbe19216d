//! Каталог: список, поиск, создание и удаление сеансов.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use super::ApiError;
use crate::middleware::AuthUser;
use crate::models::NewShowing;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies/all", get(get_all_movies))
        .route("/movies/search/{movie_name}", get(search_movies))
        .route("/movies", post(create_movie))
        .route("/movies/{movie_name}/delete/{theatre_name}", delete(delete_movie))
}

// GET /api/movies/all
async fn get_all_movies(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let showings = state.booking.catalog.list().await?;
    if showings.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok((StatusCode::OK, Json(showings)).into_response())
}

// GET /api/movies/search/{movie_name}
async fn search_movies(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(movie_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let showings = state.booking.catalog.search(&movie_name).await?;
    if showings.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok((StatusCode::OK, Json(showings)).into_response())
}

// POST /api/movies
#[derive(Debug, Deserialize, Validate)]
struct CreateMovieRequest {
    #[validate(length(min = 1, max = 200))]
    movie_name: String,
    #[validate(length(min = 1, max = 200))]
    theatre_name: String,
    #[validate(range(min = 1, max = 100000))]
    capacity: u32,
}

async fn create_movie(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateMovieRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::forbidden("Only admins can add showings"));
    }
    req.validate()?;

    let showing = state
        .booking
        .catalog
        .create(NewShowing {
            movie_name: req.movie_name,
            theatre_name: req.theatre_name,
            capacity: req.capacity,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(showing)))
}

// DELETE /api/movies/{movie_name}/delete/{theatre_name}
async fn delete_movie(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((movie_name, theatre_name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::forbidden("Only admins can delete showings"));
    }

    let showing = state.booking.catalog.delete(&movie_name, &theatre_name).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("{} movie deleted successfully.", showing.movie_name),
            "showing_id": showing.id,
        })),
    ))
}
