//! Типизированные ошибки движка бронирования и хранилищ.

use std::time::Duration;

use thiserror::Error;

use crate::models::{SeatNumber, ShowingId};

/// Ошибки слоя хранения (Postgres, Redis, in-memory).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted ticket already holds some of these seats.
    #[error("seats already held for showing {showing_id}: {seats:?}")]
    SeatsTaken {
        showing_id: ShowingId,
        seats: Vec<SeatNumber>,
    },

    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Исходы бронирования, отличные от `Confirmed`.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("invalid booking request: {0}")]
    Validation(String),

    #[error("showing {0} not found")]
    ShowingNotFound(ShowingId),

    #[error("requested {requested} seats but only {available} available")]
    CapacityExceeded { requested: usize, available: u32 },

    #[error("seats already booked: {seats:?}")]
    SeatConflict { seats: Vec<SeatNumber> },

    #[error("ticket could not be persisted: {0}")]
    PersistenceFailure(String),
}

impl BookingError {
    pub(crate) fn persist_timeout(after: Duration) -> Self {
        BookingError::PersistenceFailure(format!("timed out after {}ms", after.as_millis()))
    }

    /// Стабильный код для клиентов.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "VALIDATION_ERROR",
            BookingError::ShowingNotFound(_) => "NOT_FOUND",
            BookingError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            BookingError::SeatConflict { .. } => "SEAT_CONFLICT",
            BookingError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
        }
    }

    /// Only storage failures are worth retrying verbatim.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::PersistenceFailure(_))
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SeatsTaken { seats, .. } => BookingError::SeatConflict { seats },
            other => BookingError::PersistenceFailure(other.to_string()),
        }
    }
}

/// Ошибки операций каталога сеансов.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid showing: {0}")]
    Validation(String),

    #[error("{movie_name} at {theatre_name} already exists")]
    AlreadyExists {
        movie_name: String,
        theatre_name: String,
    },

    #[error("{0} doesn't exist")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflict_becomes_seat_conflict() {
        let err = BookingError::from(StoreError::SeatsTaken {
            showing_id: uuid::Uuid::new_v4(),
            seats: vec![3, 4],
        });
        assert!(matches!(err, BookingError::SeatConflict { ref seats } if seats == &vec![3, 4]));
        assert!(!err.is_retryable());
    }

    #[test]
    fn cache_failure_is_retryable() {
        let redis = redis::RedisError::from((redis::ErrorKind::IoError, "connection refused"));
        let err = BookingError::from(StoreError::from(redis));
        assert_eq!(err.code(), "PERSISTENCE_FAILURE");
        assert!(err.is_retryable());
    }
}
