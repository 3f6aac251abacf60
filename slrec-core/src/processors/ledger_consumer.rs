//! Consumer worker draining one event-log partition into the
//! materializer.
//!
//! One worker owns one partition receiver, so events for an account are
//! applied strictly in publication order. Storage errors are retried with
//! bounded backoff while the event stays unacknowledged; after the retry
//! budget the event is dead-lettered (logged at error and dropped) so one
//! poisoned write cannot wedge the partition.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::events::channels::LedgerEventReceiver;
use crate::ledger::event::LedgerEvent;
use crate::materializer::{ApplyOutcome, Materializer};

const MAX_RETRY_COUNT: u32 = 5;

pub struct LedgerConsumer {
    materializer: Arc<Materializer>,
    rx: LedgerEventReceiver,
    shutdown_rx: watch::Receiver<bool>,
    partition: usize,
}

impl LedgerConsumer {
    pub fn new(
        materializer: Arc<Materializer>,
        rx: LedgerEventReceiver,
        shutdown_rx: watch::Receiver<bool>,
        partition: usize,
    ) -> Self {
        Self {
            materializer,
            rx,
            shutdown_rx,
            partition,
        }
    }

    /// Drain the partition until shutdown is signalled or every sender is
    /// dropped.
    pub async fn run(mut self) {
        info!(partition = self.partition, "ledger consumer started");
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        break;
                    }
                }
                event = self.rx.recv() => {
                    match event {
                        Some(event) => self.process(event).await,
                        None => break,
                    }
                }
            }
        }
        info!(partition = self.partition, "ledger consumer stopped");
    }

    async fn process(&mut self, event: LedgerEvent) {
        let mut attempt: u32 = 0;
        loop {
            match self.materializer.apply(&event).await {
                Ok(ApplyOutcome::Applied) => {
                    info!(
                        event_id = %event.event_id,
                        account_id = %event.account_id,
                        partition = self.partition,
                        "event applied"
                    );
                    return;
                }
                Ok(ApplyOutcome::SkippedDuplicate) => {
                    debug!(
                        event_id = %event.event_id,
                        partition = self.partition,
                        "redelivered event skipped"
                    );
                    return;
                }
                Ok(ApplyOutcome::Rejected(reason)) => {
                    // Poison input; retrying cannot change the outcome.
                    warn!(
                        event_id = %event.event_id,
                        account_id = %event.account_id,
                        %reason,
                        "event rejected, dropping"
                    );
                    return;
                }
                Err(e) => {
                    if attempt >= MAX_RETRY_COUNT {
                        error!(
                            event_id = %event.event_id,
                            account_id = %event.account_id,
                            error = %e,
                            "retry budget exhausted, dead-lettering event"
                        );
                        return;
                    }
                    let backoff = Duration::from_millis(100 * (1 << attempt));
                    warn!(
                        event_id = %event.event_id,
                        error = %e,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "storage error applying event, retrying"
                    );
                    attempt += 1;
                    tokio::select! {
                        biased;
                        _ = self.shutdown_rx.changed() => {
                            if *self.shutdown_rx.borrow() {
                                warn!(
                                    event_id = %event.event_id,
                                    "shutdown during retry backoff, abandoning event"
                                );
                                return;
                            }
                        }
                        () = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }
    }
}
