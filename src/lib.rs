pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cache::{CacheService, CachedShowingStore};
use crate::config::{BookingConfig, Config};
use crate::database::Database;
use crate::redis_client::RedisClient;
use crate::services::BookingService;
use crate::store::{InMemoryShowingStore, InMemoryTicketStore, PgShowingStore, PgTicketStore};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub booking: BookingService,
    pub db: Option<Database>,
    pub redis: Option<RedisClient>,
}

impl AppState {
    /// Postgres + Redis, как в проде.
    pub async fn connect(config: &Config) -> anyhow::Result<Arc<Self>> {
        let db = Database::connect(&config.database).await?;
        info!("Database connected");
        db.run_migrations().await?;

        let redis = RedisClient::connect(&config.redis).await?;
        info!("Redis connected");

        let cache = CacheService::new(redis.clone(), config.redis.showing_ttl_seconds);
        let showings = Arc::new(CachedShowingStore::new(
            Arc::new(PgShowingStore::new(db.clone())),
            cache,
        ));
        let tickets = Arc::new(PgTicketStore::new(db.clone()));

        Ok(Arc::new(Self {
            booking: BookingService::new(showings, tickets, &config.booking),
            db: Some(db),
            redis: Some(redis),
        }))
    }

    /// Всё в памяти: для тестов и локальных прогонов без инфраструктуры.
    pub fn in_memory(config: &BookingConfig) -> Arc<Self> {
        Arc::new(Self {
            booking: BookingService::new(
                Arc::new(InMemoryShowingStore::new()),
                Arc::new(InMemoryTicketStore::new()),
                config,
            ),
            db: None,
            redis: None,
        })
    }
}

/// Main router: health probes at the root, the API under `/api`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", axum::routing::get(|| async { "Movie Booking API v1.0" }))
        .merge(controllers::health::routes())
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
