use std::collections::BTreeSet;

use super::{SeatNumber, ShowingId};

/// Запрос на бронирование; живёт только в рамках одной попытки.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub showing_id: ShowingId,
    pub user_id: String,
    pub seat_numbers: Vec<SeatNumber>,
    pub number_of_tickets: usize,
}

impl BookingRequest {
    /// Builds a request whose count is taken from the seat list itself.
    pub fn new(showing_id: ShowingId, user_id: impl Into<String>, seat_numbers: Vec<SeatNumber>) -> Self {
        let number_of_tickets = seat_numbers.len();
        Self {
            showing_id,
            user_id: user_id.into(),
            seat_numbers,
            number_of_tickets,
        }
    }

    pub fn seat_set(&self) -> BTreeSet<SeatNumber> {
        self.seat_numbers.iter().copied().collect()
    }
}
