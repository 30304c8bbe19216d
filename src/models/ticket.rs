use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ShowingId;

pub type TicketId = Uuid;
pub type SeatNumber = u32;

/// Подтверждённая бронь. После создания не меняется.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub showing_id: ShowingId,
    pub user_id: String,
    /// Always sorted, never empty.
    pub seat_numbers: Vec<SeatNumber>,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(showing_id: ShowingId, user_id: String, mut seat_numbers: Vec<SeatNumber>) -> Self {
        seat_numbers.sort_unstable();
        Self {
            id: Uuid::new_v4(),
            showing_id,
            user_id,
            seat_numbers,
            created_at: Utc::now(),
        }
    }

    pub fn number_of_tickets(&self) -> usize {
        self.seat_numbers.len()
    }
}
