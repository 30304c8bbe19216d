pub mod availability;
pub mod booking;
pub mod catalog;
pub mod ledger;
pub mod reconcile;
pub mod tickets;

use std::sync::Arc;

use crate::config::BookingConfig;
use crate::store::{ShowingStore, TicketStore};

pub use availability::{AvailabilityQuery, BookingInfo, ShowingStatus, StatusPolicy};
pub use booking::BookingCoordinator;
pub use catalog::Catalog;
pub use ledger::{ClaimOutcome, SeatClaim, SeatLedger};
pub use reconcile::{LedgerReconciler, ReconcileStats};
pub use tickets::TicketQuery;

/// Всё, что нужно HTTP-слою, поверх одной пары хранилищ и одного реестра.
#[derive(Clone)]
pub struct BookingService {
    pub coordinator: BookingCoordinator,
    pub availability: AvailabilityQuery,
    pub tickets: TicketQuery,
    pub catalog: Catalog,
    pub ledger: Arc<SeatLedger>,
}

impl BookingService {
    pub fn new(
        showings: Arc<dyn ShowingStore>,
        tickets: Arc<dyn TicketStore>,
        config: &BookingConfig,
    ) -> Self {
        let ledger = Arc::new(SeatLedger::new(tickets.clone()));
        Self {
            coordinator: BookingCoordinator::new(
                showings.clone(),
                tickets.clone(),
                ledger.clone(),
                config.persist_timeout(),
            ),
            availability: AvailabilityQuery::new(showings.clone(), ledger.clone(), config.status_policy()),
            tickets: TicketQuery::new(tickets.clone()),
            catalog: Catalog::new(showings, tickets, ledger.clone()),
            ledger,
        }
    }

    pub fn reconciler(&self) -> LedgerReconciler {
        LedgerReconciler::new(self.ledger.clone())
    }
}
