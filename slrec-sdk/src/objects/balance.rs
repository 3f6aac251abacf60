//! Objects for the shadow-balance query API.

use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::EventKind;

/// Response of `GET /accounts/{account_id}/shadow-balance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub account_id: CompactString,
    pub balance: Decimal,
    /// Identifier of the last applied event, or `"none"` for an account
    /// without any ledger rows.
    pub last_event: CompactString,
}

/// One row of the running-balance trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTraceEntry {
    pub event_id: CompactString,
    pub kind: EventKind,
    pub amount: Decimal,
    pub occurred_at: i64,
    pub running_balance: Decimal,
}

/// Response of `GET /accounts/{account_id}/ledger` — a diagnostic view of
/// how the balance was built up in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTraceResponse {
    pub account_id: CompactString,
    pub entries: Vec<LedgerTraceEntry>,
}
