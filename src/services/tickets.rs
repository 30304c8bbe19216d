use std::sync::Arc;

use tracing::info;

use crate::error::StoreError;
use crate::models::Ticket;
use crate::store::TicketStore;

/// Чтение билетов пользователя; с механикой бронирования не пересекается.
#[derive(Clone)]
pub struct TicketQuery {
    tickets: Arc<dyn TicketStore>,
}

impl TicketQuery {
    pub fn new(tickets: Arc<dyn TicketStore>) -> Self {
        Self { tickets }
    }

    pub async fn tickets_by_user(&self, user_id: &str) -> Result<Vec<Ticket>, StoreError> {
        info!("Getting all tickets: {}", user_id);
        self.tickets.by_user(user_id).await
    }
}
