//! Correction event synthesis and publication.
//!
//! A correction is an ordinary `LedgerEvent` with a synthesized id and a
//! reason; it re-enters the event log and flows through the materializer
//! like any upstream event, so it is itself deduplicated and
//! balance-validated. The generator has no special write privilege.

use std::sync::Arc;

use compact_str::{CompactString, format_compact};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::events::log::{EventLog, PublishError};
use crate::ledger::event::{EventKind, LedgerEvent};

/// Length of the random hex suffix on correction ids. Uniqueness is
/// probabilistic; a collision degrades to a skipped duplicate in the
/// materializer, not to corruption.
const SUFFIX_LEN: usize = 8;

/// Builds and publishes compensating events.
pub struct CorrectionGenerator {
    log: Arc<dyn EventLog>,
}

impl CorrectionGenerator {
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self { log }
    }

    /// Construct a correction event. Pure; no I/O.
    ///
    /// The id is `"CORR-" + account_id + "-" + 8 lowercase hex chars`;
    /// `occurred_at` is the current wall clock in epoch milliseconds.
    pub fn generate(
        account_id: &str,
        kind: EventKind,
        amount: Decimal,
        reason: &str,
    ) -> LedgerEvent {
        let uuid = Uuid::new_v4().simple().to_string();
        let suffix = &uuid[..SUFFIX_LEN];
        let event_id: CompactString = format_compact!("CORR-{account_id}-{suffix}");

        let event = LedgerEvent {
            event_id,
            account_id: CompactString::from(account_id),
            kind,
            amount,
            occurred_at: now_millis(),
            reason: Some(reason.to_owned()),
        };
        info!(
            event_id = %event.event_id,
            account_id,
            %kind,
            %amount,
            "generated correction event"
        );
        event
    }

    /// Publish a correction onto the event log. Best-effort: the caller
    /// keeps its reconciliation results even when this fails.
    pub async fn publish(&self, event: LedgerEvent) -> Result<(), PublishError> {
        let event_id = event.event_id.clone();
        self.log.publish(event).await?;
        info!(event_id = %event_id, "correction event published");
        Ok(())
    }
}

fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
