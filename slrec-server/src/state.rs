//! Application state shared across all request handlers.

use slrec_core::drift::DriftDetector;
use slrec_core::events::EventLog;
use slrec_core::oracle::BalanceOracle;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Publisher handle onto the event log; the feed and correction APIs
    /// write through this, never directly to storage.
    pub event_log: Arc<dyn EventLog>,
    /// Read path over the ledger.
    pub oracle: BalanceOracle,
    /// Reconciliation engine.
    pub detector: Arc<DriftDetector>,
}
