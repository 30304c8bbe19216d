//! Координатор бронирования.
//!
//! Received → Validated → CapacityChecked → SeatsClaimed → TicketPersisted.
//! Решение принимает только атомарный `claim` в реестре мест,
//! проверка вместимости перед ним это быстрый отказ.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::ledger::{ClaimOutcome, SeatLedger};
use crate::error::{BookingError, StoreError};
use crate::models::{BookingRequest, SeatNumber, Ticket};
use crate::store::{ShowingStore, TicketStore};

#[derive(Clone)]
pub struct BookingCoordinator {
    showings: Arc<dyn ShowingStore>,
    tickets: Arc<dyn TicketStore>,
    ledger: Arc<SeatLedger>,
    persist_timeout: Duration,
}

/// Request shape checks that need no showing data.
fn validate_shape(request: &BookingRequest) -> Result<BTreeSet<SeatNumber>, BookingError> {
    if request.user_id.trim().is_empty() {
        return Err(BookingError::Validation("user id is required".to_string()));
    }
    if request.seat_numbers.is_empty() {
        return Err(BookingError::Validation(
            "at least one seat must be requested".to_string(),
        ));
    }

    let seats = request.seat_set();
    if seats.len() != request.seat_numbers.len() {
        return Err(BookingError::Validation(
            "seat numbers must not repeat".to_string(),
        ));
    }
    if request.number_of_tickets != seats.len() {
        return Err(BookingError::Validation(format!(
            "requested {} tickets but {} seat numbers given",
            request.number_of_tickets,
            seats.len()
        )));
    }
    Ok(seats)
}

fn validate_range(seats: &BTreeSet<SeatNumber>, capacity: u32) -> Result<(), BookingError> {
    let outside: Vec<SeatNumber> = seats
        .iter()
        .copied()
        .filter(|&seat| seat == 0 || seat > capacity)
        .collect();
    if outside.is_empty() {
        Ok(())
    } else {
        Err(BookingError::Validation(format!(
            "seats {:?} are outside 1..={}",
            outside, capacity
        )))
    }
}

impl BookingCoordinator {
    pub fn new(
        showings: Arc<dyn ShowingStore>,
        tickets: Arc<dyn TicketStore>,
        ledger: Arc<SeatLedger>,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            showings,
            tickets,
            ledger,
            persist_timeout,
        }
    }

    /// Books the requested seats and returns the persisted ticket.
    pub async fn book(&self, request: BookingRequest) -> Result<Ticket, BookingError> {
        let showing_id = request.showing_id;
        debug!("booking {:?} for showing {} by {}", request.seat_numbers, showing_id, request.user_id);

        let seats = validate_shape(&request)?;

        let showing = self
            .showings
            .get(showing_id)
            .await?
            .ok_or(BookingError::ShowingNotFound(showing_id))?;
        validate_range(&seats, showing.capacity)?;
        debug!("booking for showing {} validated", showing_id);

        let claimed = self.ledger.claimed_count(showing_id).await?;
        let available = showing.capacity.saturating_sub(claimed as u32);
        if request.number_of_tickets > available as usize {
            info!(
                "booking rejected for showing {}: {} requested, {} available",
                showing_id, request.number_of_tickets, available
            );
            return Err(BookingError::CapacityExceeded {
                requested: request.number_of_tickets,
                available,
            });
        }

        let claim = match self.ledger.claim(showing_id, &seats).await? {
            ClaimOutcome::Committed(claim) => claim,
            ClaimOutcome::Conflict(conflicts) => {
                info!("seat conflict on showing {}: {:?}", showing_id, conflicts);
                return Err(BookingError::SeatConflict { seats: conflicts });
            }
        };
        debug!("seats {:?} claimed on showing {}", claim.seats(), showing_id);

        let ticket = Ticket::new(showing_id, request.user_id, seats.into_iter().collect());

        match tokio::time::timeout(self.persist_timeout, self.tickets.insert(&ticket)).await {
            Ok(Ok(())) => {
                claim.commit();
                info!(
                    "ticket {} confirmed for {} on showing {}, seats {:?}",
                    ticket.id, ticket.user_id, showing_id, ticket.seat_numbers
                );
                Ok(ticket)
            }
            Ok(Err(StoreError::SeatsTaken { seats, .. })) => {
                // Места заняты билетом, которого наш реестр не видел
                claim.release();
                self.ledger.forget(showing_id);
                warn!("store rejected seats {:?} on showing {}, ledger re-synced", seats, showing_id);
                Err(BookingError::SeatConflict { seats })
            }
            Ok(Err(e)) => {
                claim.release();
                error!("ticket {} not persisted, seats released: {:?}", ticket.id, e);
                Err(BookingError::PersistenceFailure(e.to_string()))
            }
            Err(_) => {
                // Вставка могла всё же завершиться: проверяем, пока места
                // ещё числятся за нами
                self.ledger.forget(showing_id);
                match tokio::time::timeout(self.persist_timeout, self.tickets.get(ticket.id)).await {
                    Ok(Ok(Some(persisted))) => {
                        claim.commit();
                        info!(
                            "ticket {} persisted despite timeout, confirmed for {}",
                            persisted.id, persisted.user_id
                        );
                        Ok(persisted)
                    }
                    outcome => {
                        claim.release();
                        if let Ok(Err(e)) = outcome {
                            warn!("could not verify ticket {} after timeout: {:?}", ticket.id, e);
                        }
                        error!(
                            "ticket {} persistence timed out after {:?}, seats released",
                            ticket.id, self.persist_timeout
                        );
                        Err(BookingError::persist_timeout(self.persist_timeout))
                    }
                }
            }
        }
    }
}
