//! Доступность и статус сеанса. Только чтение, всё выводится из реестра мест.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ledger::SeatLedger;
use crate::error::BookingError;
use crate::models::{SeatNumber, Showing, ShowingId};
use crate::store::ShowingStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShowingStatus {
    SoldOut,
    BookAsap,
    Available,
}

impl ShowingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ShowingStatus::SoldOut => "SOLD_OUT",
            ShowingStatus::BookAsap => "BOOK_ASAP",
            ShowingStatus::Available => "AVAILABLE",
        }
    }
}

impl fmt::Display for ShowingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Порог срочности. Не влияет на корректность, только на ярлык.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct StatusPolicy {
    /// `None`: any showing with seats left is `BOOK_ASAP`.
    pub book_asap_threshold: Option<u32>,
}

impl StatusPolicy {
    pub fn classify(&self, available: u32) -> ShowingStatus {
        if available == 0 {
            return ShowingStatus::SoldOut;
        }
        match self.book_asap_threshold {
            Some(threshold) if available > threshold => ShowingStatus::Available,
            _ => ShowingStatus::BookAsap,
        }
    }
}

/// Сводка по сеансу: вместимость, свободные и занятые места.
#[derive(Debug, Clone, Serialize)]
pub struct BookingInfo {
    pub showing: Showing,
    pub capacity: u32,
    pub available: u32,
    pub booked_seats: Vec<SeatNumber>,
    pub status: ShowingStatus,
}

#[derive(Clone)]
pub struct AvailabilityQuery {
    showings: Arc<dyn ShowingStore>,
    ledger: Arc<SeatLedger>,
    policy: StatusPolicy,
}

impl AvailabilityQuery {
    pub fn new(showings: Arc<dyn ShowingStore>, ledger: Arc<SeatLedger>, policy: StatusPolicy) -> Self {
        Self {
            showings,
            ledger,
            policy,
        }
    }

    async fn capacity(&self, showing_id: ShowingId) -> Result<u32, BookingError> {
        self.showings
            .capacity(showing_id)
            .await?
            .ok_or(BookingError::ShowingNotFound(showing_id))
    }

    pub async fn available_count(&self, showing_id: ShowingId) -> Result<u32, BookingError> {
        let capacity = self.capacity(showing_id).await?;
        let claimed = self.ledger.claimed_count(showing_id).await?;
        Ok(capacity.saturating_sub(claimed as u32))
    }

    pub async fn status(&self, showing_id: ShowingId) -> Result<ShowingStatus, BookingError> {
        let available = self.available_count(showing_id).await?;
        Ok(self.policy.classify(available))
    }

    pub async fn booking_info(&self, showing_id: ShowingId) -> Result<BookingInfo, BookingError> {
        let showing = self
            .showings
            .get(showing_id)
            .await?
            .ok_or(BookingError::ShowingNotFound(showing_id))?;
        let booked = self.ledger.snapshot(showing_id).await?;
        let available = showing.capacity.saturating_sub(booked.len() as u32);

        Ok(BookingInfo {
            capacity: showing.capacity,
            available,
            booked_seats: booked.into_iter().collect(),
            status: self.policy.classify(available),
            showing,
        })
    }
}
