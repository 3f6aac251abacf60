//! Event channel handles and factories.
//!
//! One channel per event-log partition; the bounded buffer gives
//! backpressure to publishers while keeping memory bounded.

use tokio::sync::mpsc;

use crate::ledger::event::LedgerEvent;

/// Default buffer size for partition channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for one event-log partition.
pub type LedgerEventSender = mpsc::Sender<LedgerEvent>;
/// Receiver handle for one event-log partition.
pub type LedgerEventReceiver = mpsc::Receiver<LedgerEvent>;

/// Create the channel backing one event-log partition.
///
/// Multiple senders can be cloned from the returned sender; the receiver
/// belongs to exactly one consumer worker so per-partition ordering holds.
pub fn ledger_event_channel(buffer: usize) -> (LedgerEventSender, LedgerEventReceiver) {
    mpsc::channel(buffer.max(1))
}
