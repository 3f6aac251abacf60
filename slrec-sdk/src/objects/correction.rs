//! Objects for the operator-triggered manual correction API.

use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::EventKind;

/// Body of `POST /correct/{account_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualCorrectionRequest {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub amount: Decimal,
    /// Defaults to "Manual correction" when omitted.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Acknowledgement of a published correction event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionAck {
    pub message: String,
    pub correction_event_id: CompactString,
    pub account_id: CompactString,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub amount: Decimal,
}
