//! Drift detection between externally reported balances and the shadow
//! ledger, with synchronous self-healing correction generation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use compact_str::CompactString;
use rust_decimal::Decimal;
use slrec_sdk::objects::drift::{
    BalanceReport, DriftCheckResponse, DriftResult, DriftStatus, MismatchKind,
};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::correction::CorrectionGenerator;
use crate::ledger::event::EventKind;
use crate::oracle::BalanceOracle;

/// One minor currency unit: differences at or below this are a match.
pub const DEFAULT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Default per-account auto-correction cooldown.
pub const DEFAULT_CORRECTION_COOLDOWN: Duration = Duration::from_secs(300);

/// Caller errors on the reconciliation input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriftError {
    #[error("reconciliation batch must not be empty")]
    EmptyBatch,
}

/// Compares reported balances against the shadow ledger and publishes
/// compensating events for mismatches.
///
/// The detector and generator form one unit: every mismatch triggers
/// correction generation synchronously inside the same pass. Publication
/// is best-effort; a transport failure is logged and the pass continues.
///
/// Corrections feed back into the very log the detector's data source is
/// built from, so auto-correction is rate-limited per account: within the
/// cooldown window a repeated mismatch is still reported but no further
/// correction is published.
pub struct DriftDetector {
    oracle: BalanceOracle,
    corrections: CorrectionGenerator,
    tolerance: Decimal,
    cooldown: Duration,
    last_correction: Mutex<HashMap<CompactString, Instant>>,
}

impl DriftDetector {
    pub fn new(
        oracle: BalanceOracle,
        corrections: CorrectionGenerator,
        tolerance: Decimal,
        cooldown: Duration,
    ) -> Self {
        Self {
            oracle,
            corrections,
            tolerance,
            cooldown,
            last_correction: Mutex::new(HashMap::new()),
        }
    }

    /// Run one reconciliation pass. Order-preserving: one result per
    /// report, in input order. An empty batch is a caller error.
    ///
    /// Failures local to one account (storage read errors) yield an
    /// `error` result for that account and never abort the rest of the
    /// batch.
    pub async fn check(
        &self,
        reports: &[BalanceReport],
    ) -> Result<DriftCheckResponse, DriftError> {
        if reports.is_empty() {
            return Err(DriftError::EmptyBatch);
        }

        let mut results = Vec::with_capacity(reports.len());
        for report in reports {
            results.push(self.check_account(report).await);
        }

        let mismatches = results
            .iter()
            .filter(|r| r.status == DriftStatus::Mismatch)
            .count();
        info!(
            total_accounts = results.len(),
            mismatches, "drift check completed"
        );
        Ok(DriftCheckResponse {
            total_accounts: results.len(),
            mismatches,
            results,
        })
    }

    async fn check_account(&self, report: &BalanceReport) -> DriftResult {
        let account_id = &report.account_id;
        info!(
            account_id = %account_id,
            reported_balance = %report.reported_balance,
            "checking drift"
        );

        let shadow_balance = match self.oracle.balance_of(account_id).await {
            Ok(balance) => balance.balance,
            Err(e) => {
                error!(account_id = %account_id, error = %e, "shadow balance unavailable");
                return DriftResult {
                    account_id: account_id.clone(),
                    shadow_balance: Decimal::ZERO,
                    reported_balance: report.reported_balance,
                    difference: Decimal::ZERO,
                    status: DriftStatus::Error,
                    mismatch_kind: MismatchKind::None,
                    message: format!("Shadow balance unavailable: {e}"),
                    correction_event_id: None,
                };
            }
        };

        let difference = report.reported_balance - shadow_balance;
        let mut result = DriftResult {
            account_id: account_id.clone(),
            shadow_balance,
            reported_balance: report.reported_balance,
            difference,
            status: DriftStatus::Match,
            mismatch_kind: MismatchKind::None,
            message: String::new(),
            correction_event_id: None,
        };

        if difference.abs() <= self.tolerance {
            result.message = "Balances match".to_owned();
            info!(account_id = %account_id, "balance match");
            return result;
        }

        result.status = DriftStatus::Mismatch;
        let (kind, reason) = if difference > Decimal::ZERO {
            // The external source recorded more than the shadow ledger did.
            result.mismatch_kind = MismatchKind::MissingCredit;
            result.message = format!("Shadow ledger is missing credit of {}", difference.abs());
            (
                EventKind::Credit,
                "Auto-correction: missing credit detected",
            )
        } else {
            // The shadow ledger holds more than externally reported.
            result.mismatch_kind = MismatchKind::IncorrectDebit;
            result.message = format!(
                "Shadow ledger has extra balance of {} - may need debit correction",
                difference.abs()
            );
            (EventKind::Debit, "Auto-correction: incorrect debit detected")
        };
        warn!(
            account_id = %account_id,
            %difference,
            mismatch_kind = ?result.mismatch_kind,
            "balance mismatch"
        );

        if self.in_cooldown(account_id).await {
            warn!(
                account_id = %account_id,
                "auto-correction suppressed by per-account cooldown"
            );
            result.message.push_str(" (auto-correction suppressed by cooldown)");
            return result;
        }

        let correction =
            CorrectionGenerator::generate(account_id, kind, difference.abs(), reason);
        result.correction_event_id = Some(correction.event_id.clone());
        if let Err(e) = self.corrections.publish(correction).await {
            // Reported as an operational signal only; the result stands and
            // the remaining accounts are still checked.
            error!(
                account_id = %account_id,
                error = %e,
                "failed to publish correction event, drift check continues"
            );
        }
        result
    }

    /// Record a correction attempt for the account; true when a previous
    /// attempt is still inside the cooldown window.
    ///
    /// Expired entries are pruned on every lookup, so the map is bounded
    /// by the number of accounts corrected within one cooldown window.
    async fn in_cooldown(&self, account_id: &CompactString) -> bool {
        if self.cooldown.is_zero() {
            return false;
        }
        let mut last = self.last_correction.lock().await;
        last.retain(|_, at| at.elapsed() < self.cooldown);
        if last.contains_key(account_id) {
            return true;
        }
        last.insert(account_id.clone(), Instant::now());
        false
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::events::channels::LedgerEventReceiver;
    use crate::events::log::InProcessEventLog;
    use crate::ledger::event::LedgerEvent;
    use crate::ledger::memory::MemoryLedgerStore;
    use crate::ledger::store::{AccountBalance, BalanceStep, LedgerStore, StoreError};
    use async_trait::async_trait;

    fn report(account_id: &str, cents: i64) -> BalanceReport {
        BalanceReport {
            account_id: account_id.into(),
            reported_balance: Decimal::new(cents, 2),
        }
    }

    async fn seed(store: &MemoryLedgerStore, account_id: &str, cents: i64) {
        store
            .append(&LedgerEvent {
                event_id: format!("SEED-{account_id}").into(),
                account_id: account_id.into(),
                kind: EventKind::Credit,
                amount: Decimal::new(cents, 2),
                occurred_at: 1000,
                reason: None,
            })
            .await
            .unwrap();
    }

    fn detector_over(
        store: Arc<dyn LedgerStore>,
        cooldown: Duration,
    ) -> (DriftDetector, LedgerEventReceiver) {
        let (log, mut receivers) = InProcessEventLog::new(1, 16);
        let log = Arc::new(log);
        let detector = DriftDetector::new(
            BalanceOracle::new(store),
            CorrectionGenerator::new(log),
            DEFAULT_TOLERANCE,
            cooldown,
        );
        (detector, receivers.remove(0))
    }

    #[tokio::test]
    async fn matching_balances_produce_no_correction() {
        let store = Arc::new(MemoryLedgerStore::new());
        seed(&store, "A10", 100000).await;
        let (detector, mut rx) = detector_over(store, Duration::ZERO);

        let response = detector.check(&[report("A10", 100000)]).await.unwrap();
        assert_eq!(response.total_accounts, 1);
        assert_eq!(response.mismatches, 0);
        let result = &response.results[0];
        assert_eq!(result.status, DriftStatus::Match);
        assert_eq!(result.mismatch_kind, MismatchKind::None);
        assert_eq!(result.message, "Balances match");
        assert_eq!(result.correction_event_id, None);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_credit_generates_a_credit_correction() {
        let store = Arc::new(MemoryLedgerStore::new());
        seed(&store, "A20", 95000).await;
        let (detector, mut rx) = detector_over(store, Duration::ZERO);

        let response = detector.check(&[report("A20", 100000)]).await.unwrap();
        assert_eq!(response.mismatches, 1);
        let result = &response.results[0];
        assert_eq!(result.status, DriftStatus::Mismatch);
        assert_eq!(result.mismatch_kind, MismatchKind::MissingCredit);
        assert_eq!(result.difference, Decimal::new(5000, 2));
        let correction_id = result.correction_event_id.as_ref().unwrap();
        assert!(correction_id.starts_with("CORR-A20-"));

        let correction = rx.try_recv().unwrap();
        assert_eq!(&correction.event_id, correction_id);
        assert_eq!(correction.kind, EventKind::Credit);
        assert_eq!(correction.amount, Decimal::new(5000, 2));
        assert_eq!(
            correction.reason.as_deref(),
            Some("Auto-correction: missing credit detected")
        );
    }

    #[tokio::test]
    async fn incorrect_debit_generates_a_debit_correction() {
        let store = Arc::new(MemoryLedgerStore::new());
        seed(&store, "A30", 105000).await;
        let (detector, mut rx) = detector_over(store, Duration::ZERO);

        let response = detector.check(&[report("A30", 100000)]).await.unwrap();
        let result = &response.results[0];
        assert_eq!(result.status, DriftStatus::Mismatch);
        assert_eq!(result.mismatch_kind, MismatchKind::IncorrectDebit);
        assert_eq!(result.difference, Decimal::new(-5000, 2));

        let correction = rx.try_recv().unwrap();
        assert_eq!(correction.kind, EventKind::Debit);
        assert_eq!(correction.amount, Decimal::new(5000, 2));
    }

    #[tokio::test]
    async fn tolerance_boundary_is_inclusive() {
        let store = Arc::new(MemoryLedgerStore::new());
        seed(&store, "A40", 100000).await;
        let (detector, mut rx) = detector_over(store, Duration::ZERO);

        // Exactly one minor unit off: match.
        let response = detector.check(&[report("A40", 100001)]).await.unwrap();
        assert_eq!(response.results[0].status, DriftStatus::Match);
        assert!(rx.try_recv().is_err());

        // Just past the tolerance: mismatch.
        let over = BalanceReport {
            account_id: "A40".into(),
            reported_balance: Decimal::new(1000011, 3), // 1000.011
        };
        let response = detector.check(std::slice::from_ref(&over)).await.unwrap();
        assert_eq!(response.results[0].status, DriftStatus::Mismatch);
        assert_eq!(
            response.results[0].mismatch_kind,
            MismatchKind::MissingCredit
        );
    }

    #[tokio::test]
    async fn empty_account_with_zero_report_matches() {
        let store = Arc::new(MemoryLedgerStore::new());
        let (detector, _rx) = detector_over(store, Duration::ZERO);

        let response = detector.check(&[report("A50", 0)]).await.unwrap();
        let result = &response.results[0];
        assert_eq!(result.status, DriftStatus::Match);
        assert_eq!(result.shadow_balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn empty_batch_is_a_caller_error() {
        let store = Arc::new(MemoryLedgerStore::new());
        let (detector, _rx) = detector_over(store, Duration::ZERO);
        assert_eq!(detector.check(&[]).await, Err(DriftError::EmptyBatch));
    }

    #[tokio::test]
    async fn publish_failure_does_not_abort_the_pass() {
        let store = Arc::new(MemoryLedgerStore::new());
        seed(&store, "A60", 95000).await;
        seed(&store, "A61", 100000).await;
        let (detector, rx) = detector_over(store, Duration::ZERO);
        drop(rx); // transport gone

        let response = detector
            .check(&[report("A60", 100000), report("A61", 100000)])
            .await
            .unwrap();
        assert_eq!(response.total_accounts, 2);
        // The mismatch result still carries the generated correction id.
        assert_eq!(response.results[0].status, DriftStatus::Mismatch);
        assert!(response.results[0].correction_event_id.is_some());
        assert_eq!(response.results[1].status, DriftStatus::Match);
    }

    #[tokio::test]
    async fn cooldown_suppresses_repeated_corrections() {
        let store = Arc::new(MemoryLedgerStore::new());
        seed(&store, "A70", 95000).await;
        let (detector, mut rx) = detector_over(store, Duration::from_secs(3600));

        let first = detector.check(&[report("A70", 100000)]).await.unwrap();
        assert!(first.results[0].correction_event_id.is_some());
        assert!(rx.try_recv().is_ok());

        // The correction has not been materialized, so the mismatch is
        // still there, but no second correction is published.
        let second = detector.check(&[report("A70", 100000)]).await.unwrap();
        let result = &second.results[0];
        assert_eq!(result.status, DriftStatus::Mismatch);
        assert_eq!(result.correction_event_id, None);
        assert!(result.message.ends_with("(auto-correction suppressed by cooldown)"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_cooldown_entries_are_pruned() {
        let store = Arc::new(MemoryLedgerStore::new());
        seed(&store, "A80", 95000).await;
        seed(&store, "A81", 95000).await;
        let (detector, _rx) = detector_over(store, Duration::from_secs(60));

        let first = detector.check(&[report("A80", 100000)]).await.unwrap();
        assert!(first.results[0].correction_event_id.is_some());

        // Paused clock: the sleep advances time past the cooldown window.
        tokio::time::sleep(Duration::from_secs(61)).await;

        let second = detector.check(&[report("A81", 100000)]).await.unwrap();
        assert!(second.results[0].correction_event_id.is_some());

        // The stale A80 entry was dropped on that lookup.
        let last = detector.last_correction.lock().await;
        assert_eq!(last.len(), 1);
        assert!(last.contains_key("A81"));
    }

    // Store stub whose reads fail for one account, for batch-independence
    // coverage.
    struct FlakyStore {
        inner: MemoryLedgerStore,
        failing_account: &'static str,
    }

    impl FlakyStore {
        fn check(&self, account_id: &str) -> Result<(), StoreError> {
            if account_id == self.failing_account {
                return Err(StoreError::Unavailable("connection refused".to_owned()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl LedgerStore for FlakyStore {
        async fn contains(&self, event_id: &str) -> Result<bool, StoreError> {
            self.inner.contains(event_id).await
        }
        async fn append(&self, event: &LedgerEvent) -> Result<bool, StoreError> {
            self.inner.append(event).await
        }
        async fn balance_of(&self, account_id: &str) -> Result<Decimal, StoreError> {
            self.check(account_id)?;
            self.inner.balance_of(account_id).await
        }
        async fn account_balance(
            &self,
            account_id: &str,
        ) -> Result<AccountBalance, StoreError> {
            self.check(account_id)?;
            self.inner.account_balance(account_id).await
        }
        async fn events_for(&self, account_id: &str) -> Result<Vec<LedgerEvent>, StoreError> {
            self.check(account_id)?;
            self.inner.events_for(account_id).await
        }
        async fn running_balance(
            &self,
            account_id: &str,
        ) -> Result<Vec<BalanceStep>, StoreError> {
            self.check(account_id)?;
            self.inner.running_balance(account_id).await
        }
    }

    #[tokio::test]
    async fn storage_failure_on_one_account_spares_the_batch() {
        let store = FlakyStore {
            inner: MemoryLedgerStore::new(),
            failing_account: "B",
        };
        seed(&store.inner, "A", 100000).await;
        seed(&store.inner, "C", 95000).await;
        let (detector, _rx) = detector_over(Arc::new(store), Duration::ZERO);

        let response = detector
            .check(&[report("A", 100000), report("B", 50000), report("C", 100000)])
            .await
            .unwrap();

        assert_eq!(response.total_accounts, 3);
        assert_eq!(response.mismatches, 1);
        let ids: Vec<&str> = response
            .results
            .iter()
            .map(|r| r.account_id.as_str())
            .collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(response.results[0].status, DriftStatus::Match);
        assert_eq!(response.results[1].status, DriftStatus::Error);
        assert!(response.results[1].message.contains("connection refused"));
        assert_eq!(response.results[2].status, DriftStatus::Mismatch);
    }
}
