use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use super::{ShowingStore, TicketStore};
use crate::error::StoreError;
use crate::models::{SeatNumber, Showing, ShowingId, Ticket, TicketId};

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

/// In-memory showing catalog.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryShowingStore {
    showings: RwLock<HashMap<ShowingId, Showing>>,
}

impl InMemoryShowingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShowingStore for InMemoryShowingStore {
    async fn get(&self, id: ShowingId) -> Result<Option<Showing>, StoreError> {
        let showings = self.showings.read().map_err(|_| poisoned())?;
        Ok(showings.get(&id).cloned())
    }

    async fn find_by_name(
        &self,
        movie_name: &str,
        theatre_name: &str,
    ) -> Result<Option<Showing>, StoreError> {
        let showings = self.showings.read().map_err(|_| poisoned())?;
        Ok(showings
            .values()
            .find(|s| s.matches(movie_name, theatre_name))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Showing>, StoreError> {
        let showings = self.showings.read().map_err(|_| poisoned())?;
        let mut all: Vec<Showing> = showings.values().cloned().collect();
        all.sort_by(|a, b| {
            (a.movie_name.to_lowercase(), a.theatre_name.to_lowercase())
                .cmp(&(b.movie_name.to_lowercase(), b.theatre_name.to_lowercase()))
        });
        Ok(all)
    }

    async fn search(&self, movie_name: &str) -> Result<Vec<Showing>, StoreError> {
        let needle = movie_name.to_lowercase();
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|s| s.movie_name.to_lowercase().contains(&needle))
            .collect())
    }

    async fn insert(&self, showing: &Showing) -> Result<(), StoreError> {
        let mut showings = self.showings.write().map_err(|_| poisoned())?;
        if showings
            .values()
            .any(|s| s.id == showing.id || s.matches(&showing.movie_name, &showing.theatre_name))
        {
            return Err(StoreError::Duplicate(format!(
                "showing {} at {}",
                showing.movie_name, showing.theatre_name
            )));
        }
        showings.insert(showing.id, showing.clone());
        Ok(())
    }

    async fn delete(&self, id: ShowingId) -> Result<bool, StoreError> {
        let mut showings = self.showings.write().map_err(|_| poisoned())?;
        Ok(showings.remove(&id).is_some())
    }
}

#[derive(Debug, Default)]
struct TicketTables {
    tickets: Vec<Ticket>,
    // (showing, seat) index, same role as the ticket_seats primary key
    seats: HashMap<ShowingId, BTreeSet<SeatNumber>>,
}

/// In-memory ticket store with the same seat-uniqueness guarantee as Postgres.
#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    tables: RwLock<TicketTables>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tickets across all showings.
    pub fn len(&self) -> usize {
        self.tables.read().map(|t| t.tickets.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tickets_for_showing(&self, showing_id: ShowingId) -> Vec<Ticket> {
        self.tables
            .read()
            .map(|t| {
                t.tickets
                    .iter()
                    .filter(|ticket| ticket.showing_id == showing_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn insert(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let held = tables.seats.entry(ticket.showing_id).or_default();

        let taken: Vec<SeatNumber> = ticket
            .seat_numbers
            .iter()
            .copied()
            .filter(|seat| held.contains(seat))
            .collect();
        if !taken.is_empty() {
            return Err(StoreError::SeatsTaken {
                showing_id: ticket.showing_id,
                seats: taken,
            });
        }

        held.extend(ticket.seat_numbers.iter().copied());
        tables.tickets.push(ticket.clone());
        Ok(())
    }

    async fn get(&self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn claimed_seats(&self, showing_id: ShowingId) -> Result<BTreeSet<SeatNumber>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.seats.get(&showing_id).cloned().unwrap_or_default())
    }

    async fn by_user(&self, user_id: &str) -> Result<Vec<Ticket>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let mut tickets: Vec<Ticket> = tables
            .tickets
            .iter()
            .filter(|t| t.user_id.eq_ignore_ascii_case(user_id))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tickets)
    }

    async fn delete_for_showing(&self, showing_id: ShowingId) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let before = tables.tickets.len();
        tables.tickets.retain(|t| t.showing_id != showing_id);
        tables.seats.remove(&showing_id);
        Ok((before - tables.tickets.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewShowing;
    use uuid::Uuid;

    fn showing(movie: &str, theatre: &str) -> Showing {
        NewShowing {
            movie_name: movie.to_string(),
            theatre_name: theatre.to_string(),
            capacity: 10,
        }
        .into_showing()
    }

    #[tokio::test]
    async fn natural_key_is_case_insensitive() {
        let store = InMemoryShowingStore::new();
        store.insert(&showing("Dune", "Odeon")).await.unwrap();

        let err = store.insert(&showing("DUNE", "odeon")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert!(store.find_by_name("dune", "ODEON").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn search_matches_substring() {
        let store = InMemoryShowingStore::new();
        store.insert(&showing("Dune: Part Two", "Odeon")).await.unwrap();
        store.insert(&showing("Arrival", "Odeon")).await.unwrap();

        let found = store.search("part").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].movie_name, "Dune: Part Two");
    }

    #[tokio::test]
    async fn overlapping_ticket_is_rejected_without_side_effects() {
        let store = InMemoryTicketStore::new();
        let showing_id = Uuid::new_v4();
        store
            .insert(&Ticket::new(showing_id, "alice".into(), vec![1, 2]))
            .await
            .unwrap();

        let err = store
            .insert(&Ticket::new(showing_id, "bob".into(), vec![2, 3]))
            .await
            .unwrap_err();
        match err {
            StoreError::SeatsTaken { seats, .. } => assert_eq!(seats, vec![2]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.claimed_seats(showing_id).await.unwrap(),
            BTreeSet::from([1, 2])
        );
    }

    #[tokio::test]
    async fn tickets_by_user_ignore_case() {
        let store = InMemoryTicketStore::new();
        let showing_id = Uuid::new_v4();
        store
            .insert(&Ticket::new(showing_id, "Alice".into(), vec![1]))
            .await
            .unwrap();

        assert_eq!(store.by_user("alice").await.unwrap().len(), 1);
        assert!(store.by_user("bob").await.unwrap().is_empty());
    }
}
