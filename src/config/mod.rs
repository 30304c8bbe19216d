use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::services::availability::StatusPolicy;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub booking: BookingConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub json_logs: bool,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub showing_ttl_seconds: u64,
}

// Настройки движка бронирования
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Сколько ждём сохранения билета, прежде чем откатить захват мест.
    pub persist_timeout_ms: u64,
    pub reconcile_interval_seconds: u64,
    /// Порог "BOOK_ASAP"; без значения любой непроданный сеанс считается срочным.
    pub book_asap_threshold: Option<u32>,
}

impl BookingConfig {
    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_seconds)
    }

    pub fn status_policy(&self) -> StatusPolicy {
        StatusPolicy {
            book_asap_threshold: self.book_asap_threshold,
        }
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            persist_timeout_ms: 5_000,
            reconcile_interval_seconds: 300,
            book_asap_threshold: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn optional<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
        _ => Ok(None),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parsed("PORT", "8000")?,
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "movie_booking=debug,tower_http=debug".to_string()),
                json_logs: env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parsed("DB_POOL_SIZE", "20")?,
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
                showing_ttl_seconds: parsed("SHOWING_CACHE_TTL_SECONDS", "3600")?,
            },
            booking: BookingConfig {
                persist_timeout_ms: parsed("BOOKING_PERSIST_TIMEOUT_MS", "5000")?,
                reconcile_interval_seconds: parsed("RECONCILE_INTERVAL_SECS", "300")?,
                book_asap_threshold: optional("BOOK_ASAP_THRESHOLD")?,
            },
        })
    }
}
