//! Каталог сеансов: список, поиск, создание и удаление.

use std::sync::Arc;

use tracing::info;

use super::ledger::SeatLedger;
use crate::error::{CatalogError, StoreError};
use crate::models::{NewShowing, Showing};
use crate::store::{ShowingStore, TicketStore};

/// Upper bound on seats per showing; also keeps capacity inside Postgres `INTEGER`.
pub const MAX_CAPACITY: u32 = 100_000;

#[derive(Clone)]
pub struct Catalog {
    showings: Arc<dyn ShowingStore>,
    tickets: Arc<dyn TicketStore>,
    ledger: Arc<SeatLedger>,
}

impl Catalog {
    pub fn new(
        showings: Arc<dyn ShowingStore>,
        tickets: Arc<dyn TicketStore>,
        ledger: Arc<SeatLedger>,
    ) -> Self {
        Self {
            showings,
            tickets,
            ledger,
        }
    }

    pub async fn list(&self) -> Result<Vec<Showing>, CatalogError> {
        Ok(self.showings.list().await?)
    }

    pub async fn search(&self, movie_name: &str) -> Result<Vec<Showing>, CatalogError> {
        info!("Search by movie name: {}", movie_name);
        Ok(self.showings.search(movie_name.trim()).await?)
    }

    pub async fn create(&self, new: NewShowing) -> Result<Showing, CatalogError> {
        if new.movie_name.trim().is_empty() || new.theatre_name.trim().is_empty() {
            return Err(CatalogError::Validation(
                "movie and theatre names are required".to_string(),
            ));
        }
        if new.capacity == 0 || new.capacity > MAX_CAPACITY {
            return Err(CatalogError::Validation(format!(
                "capacity must be within 1..={}",
                MAX_CAPACITY
            )));
        }

        let showing = NewShowing {
            movie_name: new.movie_name.trim().to_string(),
            theatre_name: new.theatre_name.trim().to_string(),
            capacity: new.capacity,
        }
        .into_showing();

        match self.showings.insert(&showing).await {
            Ok(()) => {
                info!(
                    "showing {} created: {} at {} ({} seats)",
                    showing.id, showing.movie_name, showing.theatre_name, showing.capacity
                );
                Ok(showing)
            }
            Err(StoreError::Duplicate(_)) => Err(CatalogError::AlreadyExists {
                movie_name: showing.movie_name,
                theatre_name: showing.theatre_name,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes the showing with all its tickets and its ledger.
    pub async fn delete(&self, movie_name: &str, theatre_name: &str) -> Result<Showing, CatalogError> {
        info!("Delete movie: {} at theatre: {}", movie_name, theatre_name);

        let showing = self
            .showings
            .find_by_name(movie_name, theatre_name)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("{} at {}", movie_name, theatre_name)))?;

        // Postgres удалил бы билеты каскадно, in-memory хранилище само этого не делает
        let removed = self.tickets.delete_for_showing(showing.id).await?;
        if !self.showings.delete(showing.id).await? {
            return Err(CatalogError::NotFound(format!("{} at {}", movie_name, theatre_name)));
        }
        self.ledger.remove(showing.id);

        info!("showing {} deleted together with {} tickets", showing.id, removed);
        Ok(showing)
    }
}
