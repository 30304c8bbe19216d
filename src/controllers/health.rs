use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/health/ready", get(readiness))
}

// Готовность: Postgres и Redis (если подключены) отвечают
async fn readiness(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match &state.db {
        Some(db) => db.ping().await.is_ok(),
        None => true,
    };
    let cache = match &state.redis {
        Some(redis) => redis.ping().await.is_ok(),
        None => true,
    };

    let status = if database && cache {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!({ "database": database, "cache": cache })))
}
