//! Хранилища на Postgres.
//!
//! Уникальность мест обеспечивает таблица `ticket_seats` с первичным ключом
//! `(showing_id, seat_number)`: билет вставляется в одной транзакции вместе со
//! своими местами, и если хоть одно место уже занято, транзакция откатывается.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ShowingStore, TicketStore};
use crate::database::Database;
use crate::error::StoreError;
use crate::models::{SeatNumber, Showing, ShowingId, Ticket, TicketId};

#[derive(FromRow)]
struct ShowingRow {
    id: Uuid,
    movie_name: String,
    theatre_name: String,
    capacity: i32,
    created_at: DateTime<Utc>,
}

impl From<ShowingRow> for Showing {
    fn from(row: ShowingRow) -> Self {
        Showing {
            id: row.id,
            movie_name: row.movie_name,
            theatre_name: row.theatre_name,
            capacity: row.capacity.max(0) as u32,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct TicketRow {
    id: Uuid,
    showing_id: Uuid,
    user_id: String,
    seat_numbers: Vec<i32>,
    created_at: DateTime<Utc>,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Ticket {
            id: row.id,
            showing_id: row.showing_id,
            user_id: row.user_id,
            seat_numbers: row.seat_numbers.into_iter().map(|s| s.max(0) as u32).collect(),
            created_at: row.created_at,
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

const SHOWING_COLUMNS: &str = "id, movie_name, theatre_name, capacity, created_at";

#[derive(Clone)]
pub struct PgShowingStore {
    db: Database,
}

impl PgShowingStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ShowingStore for PgShowingStore {
    async fn get(&self, id: ShowingId) -> Result<Option<Showing>, StoreError> {
        let row = sqlx::query_as::<_, ShowingRow>(&format!(
            "SELECT {SHOWING_COLUMNS} FROM showings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(row.map(Showing::from))
    }

    async fn find_by_name(
        &self,
        movie_name: &str,
        theatre_name: &str,
    ) -> Result<Option<Showing>, StoreError> {
        let row = sqlx::query_as::<_, ShowingRow>(&format!(
            "SELECT {SHOWING_COLUMNS} FROM showings
             WHERE LOWER(movie_name) = LOWER($1) AND LOWER(theatre_name) = LOWER($2)"
        ))
        .bind(movie_name)
        .bind(theatre_name)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(row.map(Showing::from))
    }

    async fn list(&self) -> Result<Vec<Showing>, StoreError> {
        let rows = sqlx::query_as::<_, ShowingRow>(&format!(
            "SELECT {SHOWING_COLUMNS} FROM showings
             ORDER BY LOWER(movie_name), LOWER(theatre_name)"
        ))
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows.into_iter().map(Showing::from).collect())
    }

    async fn search(&self, movie_name: &str) -> Result<Vec<Showing>, StoreError> {
        // POSITION вместо ILIKE: пользовательский ввод не нужно экранировать
        let rows = sqlx::query_as::<_, ShowingRow>(&format!(
            "SELECT {SHOWING_COLUMNS} FROM showings
             WHERE POSITION(LOWER($1) IN LOWER(movie_name)) > 0
             ORDER BY LOWER(movie_name), LOWER(theatre_name)"
        ))
        .bind(movie_name)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows.into_iter().map(Showing::from).collect())
    }

    async fn insert(&self, showing: &Showing) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO showings (id, movie_name, theatre_name, capacity, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(showing.id)
        .bind(&showing.movie_name)
        .bind(&showing.theatre_name)
        .bind(showing.capacity as i32) // bounded by Catalog::create
        .bind(showing.created_at)
        .execute(&self.db.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate(format!(
                "showing {} at {}",
                showing.movie_name, showing.theatre_name
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: ShowingId) -> Result<bool, StoreError> {
        // tickets и ticket_seats удаляются каскадно
        let result = sqlx::query("DELETE FROM showings WHERE id = $1")
            .bind(id)
            .execute(&self.db.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PgTicketStore {
    db: Database,
}

impl PgTicketStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn insert(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let seats: Vec<i32> = ticket.seat_numbers.iter().map(|&s| s as i32).collect();
        let mut tx = self.db.pool.begin().await?;

        sqlx::query(
            "INSERT INTO tickets (id, showing_id, user_id, seat_numbers, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(ticket.id)
        .bind(ticket.showing_id)
        .bind(&ticket.user_id)
        .bind(&seats)
        .bind(ticket.created_at)
        .execute(&mut *tx)
        .await?;

        // Условная вставка: занятые места просто не попадут в RETURNING
        let inserted: Vec<i32> = sqlx::query_scalar(
            r#"
            INSERT INTO ticket_seats (showing_id, seat_number, ticket_id)
            SELECT $1, seat, $2 FROM UNNEST($3::int4[]) AS seat
            ON CONFLICT (showing_id, seat_number) DO NOTHING
            RETURNING seat_number
            "#,
        )
        .bind(ticket.showing_id)
        .bind(ticket.id)
        .bind(&seats)
        .fetch_all(&mut *tx)
        .await?;

        if inserted.len() != seats.len() {
            tx.rollback().await?;
            let inserted: BTreeSet<i32> = inserted.into_iter().collect();
            let taken: Vec<SeatNumber> = seats
                .iter()
                .filter(|s| !inserted.contains(*s))
                .map(|&s| s as u32)
                .collect();
            warn!(
                "ticket {} for showing {} rejected by store, seats {:?} already held",
                ticket.id, ticket.showing_id, taken
            );
            return Err(StoreError::SeatsTaken {
                showing_id: ticket.showing_id,
                seats: taken,
            });
        }

        tx.commit().await?;
        debug!("ticket {} persisted with {} seats", ticket.id, seats.len());
        Ok(())
    }

    async fn get(&self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query_as::<_, TicketRow>(
            "SELECT id, showing_id, user_id, seat_numbers, created_at FROM tickets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(row.map(Ticket::from))
    }

    async fn claimed_seats(&self, showing_id: ShowingId) -> Result<BTreeSet<SeatNumber>, StoreError> {
        let seats: Vec<i32> = sqlx::query_scalar(
            "SELECT seat_number FROM ticket_seats WHERE showing_id = $1",
        )
        .bind(showing_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(seats.into_iter().map(|s| s as u32).collect())
    }

    async fn by_user(&self, user_id: &str) -> Result<Vec<Ticket>, StoreError> {
        let rows = sqlx::query_as::<_, TicketRow>(
            "SELECT id, showing_id, user_id, seat_numbers, created_at
             FROM tickets
             WHERE LOWER(user_id) = LOWER($1)
             ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn delete_for_showing(&self, showing_id: ShowingId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM tickets WHERE showing_id = $1")
            .bind(showing_id)
            .execute(&self.db.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
