//! Фоновая сверка реестра мест с сохранёнными билетами.
//!
//! Claimed seats with no ticket and no in-flight booking are released;
//! seats persisted by another instance are picked up.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::ledger::SeatLedger;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    pub showings_checked: usize,
    pub leaked_seats_released: usize,
    pub failures: usize,
}

#[derive(Clone)]
pub struct LedgerReconciler {
    ledger: Arc<SeatLedger>,
}

impl LedgerReconciler {
    pub fn new(ledger: Arc<SeatLedger>) -> Self {
        Self { ledger }
    }

    /// Один проход по всем загруженным сеансам.
    pub async fn run_sweep(&self) -> ReconcileStats {
        let showings = self.ledger.loaded_showings();
        let results = join_all(showings.iter().map(|id| self.ledger.reconcile(*id))).await;

        let mut stats = ReconcileStats {
            showings_checked: showings.len(),
            ..ReconcileStats::default()
        };
        for (showing_id, result) in showings.iter().zip(results) {
            match result {
                Ok(leaked) => stats.leaked_seats_released += leaked,
                Err(e) => {
                    stats.failures += 1;
                    error!("reconcile of showing {} failed: {:?}", showing_id, e);
                }
            }
        }

        if stats.leaked_seats_released > 0 || stats.failures > 0 {
            info!("🧹 Ledger sweep: {:?}", stats);
        }
        stats
    }

    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // первый тик срабатывает сразу, пропускаем его
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.run_sweep().await;
            }
        })
    }
}
