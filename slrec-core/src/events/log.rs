//! The event log: an ordered, at-least-once delivery channel partitioned
//! by account id.
//!
//! All events for one account hash to the same partition and are consumed
//! by exactly one worker in publication order; that is what makes
//! per-account balance computation race-free without a distributed lock.

use std::hash::{DefaultHasher, Hash, Hasher};

use async_trait::async_trait;
use tracing::debug;

use super::channels::{LedgerEventReceiver, LedgerEventSender, ledger_event_channel};
use crate::ledger::event::LedgerEvent;

/// Transport-level publish failure. Recoverable: callers log it and
/// continue; they never abort a reconciliation pass over it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("event log unavailable: partition channel closed")]
    ChannelClosed,
}

/// Publisher handle onto the event log.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Publish an event onto its account's partition. Awaits when the
    /// partition buffer is full (backpressure), errors when the transport
    /// is gone.
    async fn publish(&self, event: LedgerEvent) -> Result<(), PublishError>;
}

/// In-process event log backed by one mpsc channel per partition.
pub struct InProcessEventLog {
    partitions: Vec<LedgerEventSender>,
}

impl InProcessEventLog {
    /// Create a log with `partition_count` partitions and the given
    /// per-partition buffer. Returns the log and one receiver per
    /// partition; give each receiver to exactly one consumer worker.
    pub fn new(partition_count: usize, buffer: usize) -> (Self, Vec<LedgerEventReceiver>) {
        let partition_count = partition_count.max(1);
        let mut senders = Vec::with_capacity(partition_count);
        let mut receivers = Vec::with_capacity(partition_count);
        for _ in 0..partition_count {
            let (tx, rx) = ledger_event_channel(buffer);
            senders.push(tx);
            receivers.push(rx);
        }
        (Self { partitions: senders }, receivers)
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Stable (per process) partition assignment for an account.
    pub fn partition_for(&self, account_id: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        account_id.hash(&mut hasher);
        (hasher.finish() % self.partitions.len() as u64) as usize
    }
}

#[async_trait]
impl EventLog for InProcessEventLog {
    async fn publish(&self, event: LedgerEvent) -> Result<(), PublishError> {
        let partition = self.partition_for(&event.account_id);
        debug!(
            event_id = %event.event_id,
            account_id = %event.account_id,
            partition,
            "publishing event"
        );
        self.partitions[partition]
            .send(event)
            .await
            .map_err(|_| PublishError::ChannelClosed)
    }
}
