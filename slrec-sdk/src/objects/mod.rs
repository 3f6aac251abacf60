//! Wire objects shared between the server and its callers.
//!
//! All monetary amounts are fixed-point decimals with at most two-digit
//! scale; JSON field names are camelCase to match the gateway contract.

pub mod balance;
pub mod correction;
pub mod drift;

use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Credit,
    Debit,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Credit => write!(f, "credit"),
            EventKind::Debit => write!(f, "debit"),
        }
    }
}

/// An event on the inbound feed.
///
/// The upstream intake service owns field validation and event-id
/// assignment; by the time an event reaches this shape it is expected to
/// carry a globally unique `event_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    pub event_id: CompactString,
    pub account_id: CompactString,
    pub kind: EventKind,
    pub amount: Decimal,
    /// Logical event time in epoch milliseconds, not ingestion time.
    pub occurred_at: i64,
    /// Populated on correction events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Acknowledgement returned by `POST /events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAck {
    pub event_id: CompactString,
    pub message: String,
}
