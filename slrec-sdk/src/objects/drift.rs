//! Objects for the reconciliation (drift-check) API.

use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One externally reported balance, as delivered by the core banking system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceReport {
    pub account_id: CompactString,
    pub reported_balance: Decimal,
}

/// Outcome classification for one checked account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftStatus {
    /// Reported and shadow balance agree within tolerance.
    Match,
    /// The balances diverge; a correction may have been generated.
    Mismatch,
    /// The shadow balance could not be read; the rest of the batch is
    /// unaffected.
    Error,
}

/// Direction of a detected mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// The external source recorded more than the shadow ledger did.
    MissingCredit,
    /// The shadow ledger holds more than externally reported.
    IncorrectDebit,
    None,
}

/// Result of checking one account, returned in input order.
///
/// Ephemeral: constructed inside a single reconciliation pass and never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftResult {
    pub account_id: CompactString,
    pub shadow_balance: Decimal,
    pub reported_balance: Decimal,
    /// `reported_balance - shadow_balance`.
    pub difference: Decimal,
    pub status: DriftStatus,
    pub mismatch_kind: MismatchKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction_event_id: Option<CompactString>,
}

/// Response of `POST /drift-check`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftCheckResponse {
    pub total_accounts: usize,
    pub mismatches: usize,
    pub results: Vec<DriftResult>,
}
