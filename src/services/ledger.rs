//! Реестр занятых мест (Seat Ledger).
//!
//! Для каждого сеанса хранится множество занятых мест. Все операции над одним
//! сеансом идут под его собственным мьютексом; разные сеансы друг друга не
//! блокируют. Число свободных мест нигде не хранится: это всегда
//! `capacity - |claimed|`.
//!
//! Реестр поднимается лениво: `claimed = сохранённые билеты ∪ pending`.
//! Успешный захват возвращает [`SeatClaim`]: пока билет не сохранён, места
//! числятся "в полёте" (pending). Если guard уничтожен без `commit()`
//! (ошибка, таймаут, отменённая future), места освобождаются синхронно.
//!
//! `forget` сбрасывает только загруженную копию сохранённых мест; pending
//! переживает перезагрузку, поэтому места незавершённых бронирований никто
//! не перехватит.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::models::{SeatNumber, ShowingId};
use crate::store::TicketStore;

#[derive(Debug, Default)]
struct ShowingSeats {
    /// `false` until hydrated, and again after `forget`. `claimed` is empty then.
    loaded: bool,
    /// Persisted seats plus in-flight claims.
    claimed: BTreeSet<SeatNumber>,
    /// Claimed but not yet backed by a durable ticket. Survives reloads.
    pending: BTreeSet<SeatNumber>,
    /// Bumped on every commit; lets a reload detect a racing commit.
    commits: u64,
    /// Bumped on every `forget`.
    generation: u64,
}

impl ShowingSeats {
    fn unload(&mut self) {
        self.loaded = false;
        self.claimed.clear();
        self.generation += 1;
    }
}

type Slot = Arc<Mutex<ShowingSeats>>;

fn lock(slot: &Slot) -> MutexGuard<'_, ShowingSeats> {
    // Критические секции не паникуют посреди изменения множества
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of [`SeatLedger::claim`].
#[derive(Debug)]
pub enum ClaimOutcome {
    Committed(SeatClaim),
    /// Seats of the request that are already claimed, ascending.
    Conflict(Vec<SeatNumber>),
}

pub struct SeatLedger {
    showings: DashMap<ShowingId, Slot>,
    tickets: Arc<dyn TicketStore>,
}

impl SeatLedger {
    pub fn new(tickets: Arc<dyn TicketStore>) -> Self {
        Self {
            showings: DashMap::new(),
            tickets,
        }
    }

    fn slot(&self, showing_id: ShowingId) -> Slot {
        self.showings.entry(showing_id).or_default().value().clone()
    }

    fn existing_slot(&self, showing_id: ShowingId) -> Option<Slot> {
        self.showings.get(&showing_id).map(|entry| entry.value().clone())
    }

    async fn hydrate(&self, showing_id: ShowingId, slot: &Slot) -> Result<(), StoreError> {
        loop {
            let (commits, generation) = {
                let state = lock(slot);
                if state.loaded {
                    return Ok(());
                }
                (state.commits, state.generation)
            };

            // Читаем без блокировки. Коммит или forget во время чтения
            // делают прочитанное устаревшим: читаем заново.
            let persisted = self.tickets.claimed_seats(showing_id).await?;

            let mut state = lock(slot);
            if state.loaded {
                return Ok(());
            }
            if state.commits != commits || state.generation != generation {
                continue;
            }
            state.claimed = persisted.union(&state.pending).copied().collect();
            state.loaded = true;
            debug!(
                "ledger for showing {} hydrated with {} seats ({} in flight)",
                showing_id,
                state.claimed.len(),
                state.pending.len()
            );
            return Ok(());
        }
    }

    /// Runs `read` against the hydrated state of the showing.
    async fn read<T>(
        &self,
        showing_id: ShowingId,
        read: impl Fn(&ShowingSeats) -> T,
    ) -> Result<T, StoreError> {
        loop {
            let slot = self.slot(showing_id);
            self.hydrate(showing_id, &slot).await?;
            let state = lock(&slot);
            if state.loaded {
                return Ok(read(&state));
            }
        }
    }

    /// Atomically claims `seats` if none of them is claimed yet.
    pub async fn claim(
        &self,
        showing_id: ShowingId,
        seats: &BTreeSet<SeatNumber>,
    ) -> Result<ClaimOutcome, StoreError> {
        loop {
            let slot = self.slot(showing_id);
            self.hydrate(showing_id, &slot).await?;

            let mut state = lock(&slot);
            if !state.loaded {
                // forget() между загрузкой и захватом
                continue;
            }

            let conflicts: Vec<SeatNumber> = seats.intersection(&state.claimed).copied().collect();
            if !conflicts.is_empty() {
                return Ok(ClaimOutcome::Conflict(conflicts));
            }

            state.claimed.extend(seats.iter().copied());
            state.pending.extend(seats.iter().copied());
            let generation = state.generation;
            drop(state);

            return Ok(ClaimOutcome::Committed(SeatClaim {
                slot,
                showing_id,
                seats: seats.clone(),
                generation,
                settled: false,
            }));
        }
    }

    /// Removes seats from the claimed set. Idempotent.
    pub fn release(&self, showing_id: ShowingId, seats: &BTreeSet<SeatNumber>) {
        let Some(slot) = self.existing_slot(showing_id) else {
            return;
        };
        let mut state = lock(&slot);
        for seat in seats {
            state.claimed.remove(seat);
            state.pending.remove(seat);
        }
    }

    /// Point-in-time copy of the claimed set.
    pub async fn snapshot(&self, showing_id: ShowingId) -> Result<BTreeSet<SeatNumber>, StoreError> {
        self.read(showing_id, |state| state.claimed.clone()).await
    }

    pub async fn claimed_count(&self, showing_id: ShowingId) -> Result<usize, StoreError> {
        self.read(showing_id, |state| state.claimed.len()).await
    }

    /// Drops the loaded copy of persisted seats; the next access re-hydrates
    /// from the store. In-flight claims keep their seats.
    pub fn forget(&self, showing_id: ShowingId) {
        if let Some(slot) = self.existing_slot(showing_id) {
            lock(&slot).unload();
            debug!("ledger for showing {} dropped", showing_id);
        }
    }

    /// Frees the slot entirely (showing deleted).
    pub fn remove(&self, showing_id: ShowingId) {
        if let Some((_, slot)) = self.showings.remove(&showing_id) {
            lock(&slot).unload();
        }
    }

    /// Showings whose ledger is currently held in memory.
    pub fn loaded_showings(&self) -> Vec<ShowingId> {
        self.showings
            .iter()
            .filter(|entry| {
                let state = lock(entry.value());
                state.loaded
            })
            .map(|entry| *entry.key())
            .collect()
    }

    /// Re-derives `claimed = persisted ∪ pending` and returns how many leaked
    /// seats were dropped. Skipped (returns 0) if a commit or reload raced it.
    pub async fn reconcile(&self, showing_id: ShowingId) -> Result<usize, StoreError> {
        let Some(slot) = self.existing_slot(showing_id) else {
            return Ok(0);
        };
        let (commits, generation) = {
            let state = lock(&slot);
            if !state.loaded {
                return Ok(0);
            }
            (state.commits, state.generation)
        };

        let persisted = self.tickets.claimed_seats(showing_id).await?;

        let mut state = lock(&slot);
        if !state.loaded || state.commits != commits || state.generation != generation {
            debug!("reconcile of showing {} skipped, ledger changed", showing_id);
            return Ok(0);
        }

        let expected: BTreeSet<SeatNumber> = persisted.union(&state.pending).copied().collect();
        let leaked = state.claimed.difference(&expected).count();
        if leaked > 0 {
            info!("reconcile of showing {} dropped {} leaked seats", showing_id, leaked);
        }
        state.claimed = expected;
        Ok(leaked)
    }
}

/// Захваченные, но ещё не подтверждённые билетом места.
///
/// `commit()` after the ticket is durable; anything else releases the seats.
#[derive(Debug)]
#[must_use = "dropping a claim releases its seats"]
pub struct SeatClaim {
    slot: Slot,
    showing_id: ShowingId,
    seats: BTreeSet<SeatNumber>,
    /// Generation of the ledger the seats were claimed in.
    generation: u64,
    settled: bool,
}

impl SeatClaim {
    pub fn showing_id(&self) -> ShowingId {
        self.showing_id
    }

    pub fn seats(&self) -> &BTreeSet<SeatNumber> {
        &self.seats
    }

    /// The seats are now backed by a persisted ticket.
    pub fn commit(mut self) {
        let mut state = lock(&self.slot);
        for seat in &self.seats {
            state.pending.remove(seat);
        }
        // После перезагрузки места уже в claimed: pending вошёл в объединение.
        state.commits += 1;
        drop(state);
        self.settled = true;
    }

    /// Compensating release.
    pub fn release(mut self) {
        self.release_seats();
        self.settled = true;
    }

    fn release_seats(&self) {
        let mut state = lock(&self.slot);
        for seat in &self.seats {
            state.pending.remove(seat);
        }
        if state.generation == self.generation {
            for seat in &self.seats {
                state.claimed.remove(seat);
            }
        } else if state.loaded {
            // Загружено после захвата: часть мест могла оказаться в чужих
            // билетах, поэтому не удаляем вслепую, а перечитываем.
            state.unload();
            debug!(
                "stale claim on showing {} released, ledger will re-hydrate",
                self.showing_id
            );
        }
    }
}

impl Drop for SeatClaim {
    fn drop(&mut self) {
        if !self.settled {
            warn!(
                "claim on showing {} abandoned before commit, releasing seats {:?}",
                self.showing_id, self.seats
            );
            self.release_seats();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ticket;
    use crate::store::InMemoryTicketStore;
    use uuid::Uuid;

    fn seats(list: &[SeatNumber]) -> BTreeSet<SeatNumber> {
        list.iter().copied().collect()
    }

    fn ledger() -> (SeatLedger, Arc<InMemoryTicketStore>) {
        let tickets = Arc::new(InMemoryTicketStore::new());
        (SeatLedger::new(tickets.clone()), tickets)
    }

    #[tokio::test]
    async fn hydrates_from_persisted_tickets() {
        let (ledger, tickets) = ledger();
        let showing = Uuid::new_v4();
        tickets
            .insert(&Ticket::new(showing, "alice".into(), vec![2, 4]))
            .await
            .unwrap();

        assert_eq!(ledger.snapshot(showing).await.unwrap(), seats(&[2, 4]));
        match ledger.claim(showing, &seats(&[4, 5])).await.unwrap() {
            ClaimOutcome::Conflict(conflicts) => assert_eq!(conflicts, vec![4]),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dropped_claim_releases_seats() {
        let (ledger, _) = ledger();
        let showing = Uuid::new_v4();

        let ClaimOutcome::Committed(claim) = ledger.claim(showing, &seats(&[1, 2])).await.unwrap() else {
            panic!("claim should succeed");
        };
        assert_eq!(ledger.claimed_count(showing).await.unwrap(), 2);

        drop(claim);
        assert!(ledger.snapshot(showing).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn committed_claim_survives() {
        let (ledger, _) = ledger();
        let showing = Uuid::new_v4();

        let ClaimOutcome::Committed(claim) = ledger.claim(showing, &seats(&[3])).await.unwrap() else {
            panic!("claim should succeed");
        };
        claim.commit();
        assert_eq!(ledger.snapshot(showing).await.unwrap(), seats(&[3]));
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let (ledger, _) = ledger();
        let showing = Uuid::new_v4();

        let ClaimOutcome::Committed(claim) = ledger.claim(showing, &seats(&[1, 2])).await.unwrap() else {
            panic!("claim should succeed");
        };
        claim.commit();

        ledger.release(showing, &seats(&[2, 9]));
        ledger.release(showing, &seats(&[2, 9]));
        ledger.release(Uuid::new_v4(), &seats(&[1]));
        assert_eq!(ledger.snapshot(showing).await.unwrap(), seats(&[1]));
    }

    #[tokio::test]
    async fn reconcile_drops_leaked_and_keeps_pending() {
        let (ledger, tickets) = ledger();
        let showing = Uuid::new_v4();

        // Committed without a ticket: a leak.
        let ClaimOutcome::Committed(leaked) = ledger.claim(showing, &seats(&[1])).await.unwrap() else {
            panic!("claim should succeed");
        };
        leaked.commit();

        // Properly persisted.
        let ClaimOutcome::Committed(durable) = ledger.claim(showing, &seats(&[2])).await.unwrap() else {
            panic!("claim should succeed");
        };
        tickets
            .insert(&Ticket::new(showing, "bob".into(), vec![2]))
            .await
            .unwrap();
        durable.commit();

        // Still in flight.
        let ClaimOutcome::Committed(in_flight) = ledger.claim(showing, &seats(&[3])).await.unwrap() else {
            panic!("claim should succeed");
        };

        assert_eq!(ledger.reconcile(showing).await.unwrap(), 1);
        assert_eq!(ledger.snapshot(showing).await.unwrap(), seats(&[2, 3]));

        in_flight.release();
        assert_eq!(ledger.snapshot(showing).await.unwrap(), seats(&[2]));
    }

    #[tokio::test]
    async fn forget_rehydrates_from_store() {
        let (ledger, tickets) = ledger();
        let showing = Uuid::new_v4();

        let ClaimOutcome::Committed(claim) = ledger.claim(showing, &seats(&[5])).await.unwrap() else {
            panic!("claim should succeed");
        };
        // Another instance sold seat 6 behind our back.
        tickets
            .insert(&Ticket::new(showing, "carol".into(), vec![6]))
            .await
            .unwrap();

        ledger.forget(showing);
        drop(claim);
        assert_eq!(ledger.snapshot(showing).await.unwrap(), seats(&[6]));
        assert_eq!(ledger.loaded_showings(), vec![showing]);
    }

    #[tokio::test]
    async fn in_flight_seats_survive_reload_and_commit() {
        let (ledger, tickets) = ledger();
        let showing = Uuid::new_v4();

        let ClaimOutcome::Committed(claim) = ledger.claim(showing, &seats(&[9])).await.unwrap() else {
            panic!("claim should succeed");
        };
        ledger.forget(showing);
        assert_eq!(ledger.snapshot(showing).await.unwrap(), seats(&[9]));
        assert!(matches!(
            ledger.claim(showing, &seats(&[9])).await.unwrap(),
            ClaimOutcome::Conflict(_)
        ));

        tickets
            .insert(&Ticket::new(showing, "alice".into(), vec![9]))
            .await
            .unwrap();
        claim.commit();

        let persisted = tickets.claimed_seats(showing).await.unwrap();
        assert_eq!(ledger.snapshot(showing).await.unwrap(), persisted);
        assert_eq!(ledger.reconcile(showing).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stale_release_keeps_seats_persisted_elsewhere() {
        let (ledger, tickets) = ledger();
        let showing = Uuid::new_v4();

        let ClaimOutcome::Committed(stale) = ledger.claim(showing, &seats(&[5])).await.unwrap() else {
            panic!("claim should succeed");
        };
        // Seat 5 sold by another instance while our claim is in flight.
        tickets
            .insert(&Ticket::new(showing, "carol".into(), vec![5]))
            .await
            .unwrap();
        ledger.forget(showing);
        assert_eq!(ledger.snapshot(showing).await.unwrap(), seats(&[5]));

        // A booking that started after the reload.
        let ClaimOutcome::Committed(fresh) = ledger.claim(showing, &seats(&[7])).await.unwrap() else {
            panic!("claim should succeed");
        };
        tickets
            .insert(&Ticket::new(showing, "dave".into(), vec![7]))
            .await
            .unwrap();
        fresh.commit();

        stale.release();
        let persisted = tickets.claimed_seats(showing).await.unwrap();
        assert_eq!(persisted, seats(&[5, 7]));
        assert_eq!(ledger.snapshot(showing).await.unwrap(), persisted);
    }

    #[tokio::test]
    async fn release_in_same_generation_frees_seats() {
        let (ledger, _) = ledger();
        let showing = Uuid::new_v4();

        let ClaimOutcome::Committed(claim) = ledger.claim(showing, &seats(&[1, 2])).await.unwrap() else {
            panic!("claim should succeed");
        };
        claim.release();
        assert!(matches!(
            ledger.claim(showing, &seats(&[1, 2])).await.unwrap(),
            ClaimOutcome::Committed(_)
        ));
    }
}
