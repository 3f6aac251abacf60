//! The ledger materializer — the single write path into the ledger table.
//!
//! Consumes events delivered at-least-once from the event log,
//! deduplicates by event id, enforces non-negativity and appends accepted
//! events immutably.

use std::collections::HashMap;
use std::sync::Arc;

use compact_str::CompactString;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::ledger::event::{LedgerEvent, ValidationError};
use crate::ledger::store::{LedgerStore, StoreError};

/// Why an event was permanently rejected. Rejected events are poison
/// inputs, not transient failures: they are dropped, never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("invalid event: {0}")]
    InvalidEvent(#[from] ValidationError),

    #[error("insufficient balance: current {current}, attempted change {attempted}")]
    InsufficientBalance { current: Decimal, attempted: Decimal },
}

/// Outcome of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// Exactly one row was appended to the ledger.
    Applied,
    /// The event id was already present; redelivery absorbed, no effect.
    SkippedDuplicate,
    /// The event violated an input constraint or the non-negativity
    /// invariant; no effect.
    Rejected(RejectReason),
}

/// Applies ledger events: dedup, balance check, append.
///
/// The read-check-append sequence runs under a per-account mutex, so a
/// drift-triggered correction and a manual correction racing on the same
/// account cannot both pass the non-negativity check on stale reads.
/// Cross-account applies proceed in parallel.
pub struct Materializer {
    store: Arc<dyn LedgerStore>,
    account_locks: Mutex<HashMap<CompactString, Arc<Mutex<()>>>>,
}

impl Materializer {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            account_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Apply one event. Storage failures are returned as errors so the
    /// caller can retry (the event has not been acknowledged); everything
    /// else is an [`ApplyOutcome`].
    pub async fn apply(&self, event: &LedgerEvent) -> Result<ApplyOutcome, StoreError> {
        if let Err(reason) = event.validate() {
            warn!(
                event_id = %event.event_id,
                account_id = %event.account_id,
                %reason,
                "rejecting invalid event"
            );
            return Ok(ApplyOutcome::Rejected(RejectReason::InvalidEvent(reason)));
        }

        let lock = self.account_lock(&event.account_id).await;
        let _guard = lock.lock().await;

        if self.store.contains(&event.event_id).await? {
            debug!(event_id = %event.event_id, "duplicate event detected, skipping");
            return Ok(ApplyOutcome::SkippedDuplicate);
        }

        let current = self.store.balance_of(&event.account_id).await?;
        let attempted = event.signed_amount();
        let prospective = current + attempted;
        if prospective < Decimal::ZERO {
            error!(
                event_id = %event.event_id,
                account_id = %event.account_id,
                %current,
                %prospective,
                "event would result in negative balance, rejecting"
            );
            return Ok(ApplyOutcome::Rejected(RejectReason::InsufficientBalance {
                current,
                attempted,
            }));
        }

        if !self.store.append(event).await? {
            // Lost a race against another writer; the primary key absorbed it.
            debug!(event_id = %event.event_id, "duplicate event detected at append, skipping");
            return Ok(ApplyOutcome::SkippedDuplicate);
        }

        info!(
            event_id = %event.event_id,
            account_id = %event.account_id,
            kind = %event.kind,
            amount = %event.amount,
            new_balance = %prospective,
            "event persisted to ledger"
        );
        Ok(ApplyOutcome::Applied)
    }

    async fn account_lock(&self, account_id: &CompactString) -> Arc<Mutex<()>> {
        let mut locks = self.account_locks.lock().await;
        // A lock with no outside holder can be dropped; the next apply for
        // that account recreates it. Keeps the map bounded by the number of
        // accounts currently in flight.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(account_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
