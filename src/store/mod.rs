//! Порты хранения: сеансы и билеты.
//!
//! Движок бронирования зависит только от этих трейтов. Реализации:
//! - [`postgres`]: боевое хранилище на sqlx;
//! - [`memory`]: in-memory вариант для тестов и локального запуска.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{SeatNumber, Showing, ShowingId, Ticket, TicketId};

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryShowingStore, InMemoryTicketStore};
pub use postgres::{PgShowingStore, PgTicketStore};

#[async_trait]
pub trait ShowingStore: Send + Sync {
    async fn get(&self, id: ShowingId) -> Result<Option<Showing>, StoreError>;

    /// Case-insensitive lookup by the (movie, theatre) natural key.
    async fn find_by_name(
        &self,
        movie_name: &str,
        theatre_name: &str,
    ) -> Result<Option<Showing>, StoreError>;

    /// All showings ordered by movie, then theatre.
    async fn list(&self) -> Result<Vec<Showing>, StoreError>;

    /// Case-insensitive substring match on the movie name.
    async fn search(&self, movie_name: &str) -> Result<Vec<Showing>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the natural key is taken.
    async fn insert(&self, showing: &Showing) -> Result<(), StoreError>;

    /// Returns `false` when nothing was deleted.
    async fn delete(&self, id: ShowingId) -> Result<bool, StoreError>;

    async fn capacity(&self, id: ShowingId) -> Result<Option<u32>, StoreError> {
        Ok(self.get(id).await?.map(|s| s.capacity))
    }
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Durable create. Must fail with [`StoreError::SeatsTaken`] and persist
    /// nothing if any seat is already held by another ticket of the showing.
    async fn insert(&self, ticket: &Ticket) -> Result<(), StoreError>;

    async fn get(&self, id: TicketId) -> Result<Option<Ticket>, StoreError>;

    /// Union of the seat sets of every ticket for the showing.
    async fn claimed_seats(&self, showing_id: ShowingId) -> Result<BTreeSet<SeatNumber>, StoreError>;

    /// Tickets of a user (case-insensitive), oldest first.
    async fn by_user(&self, user_id: &str) -> Result<Vec<Ticket>, StoreError>;

    async fn delete_for_showing(&self, showing_id: ShowingId) -> Result<u64, StoreError>;
}
