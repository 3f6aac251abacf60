//! The ledger table abstraction.
//!
//! The storage engine is a collaborator: the core only assumes a
//! key-ordered persistent table with a signed-sum aggregate. Two
//! implementations exist — [`super::MemoryLedgerStore`] for tests and
//! standalone runs, [`super::PgLedgerStore`] for production.

use async_trait::async_trait;
use compact_str::CompactString;
use rust_decimal::Decimal;

use super::event::{EventKind, LedgerEvent};

/// Storage-layer failures. Fatal for the in-flight operation only; the
/// caller decides whether to retry (consumer) or report (API).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A persisted row no longer decodes into a valid event.
    #[error("corrupt ledger row: {0}")]
    Corrupt(String),
}

/// Aggregate view of one account, derived on demand — never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBalance {
    pub account_id: CompactString,
    /// Signed sum of all events for the account.
    pub balance: Decimal,
    /// Event with the greatest `(occurred_at, event_id)` key, if any.
    pub last_event_id: Option<CompactString>,
}

/// One row of the running-balance trace, in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceStep {
    pub event_id: CompactString,
    pub kind: EventKind,
    pub amount: Decimal,
    pub occurred_at: i64,
    /// Balance after applying this event.
    pub running_balance: Decimal,
}

/// Read/append surface over the immutable ledger table.
///
/// Writes go through [`crate::materializer::Materializer`] exclusively;
/// reads are snapshots of already-committed state and take no locks.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Whether an event with this id has been persisted.
    async fn contains(&self, event_id: &str) -> Result<bool, StoreError>;

    /// Append an event. Returns `false` if the id was already present
    /// (the append is a no-op in that case).
    async fn append(&self, event: &LedgerEvent) -> Result<bool, StoreError>;

    /// Signed sum of all events for the account; zero if none exist.
    async fn balance_of(&self, account_id: &str) -> Result<Decimal, StoreError>;

    /// Aggregate balance plus the id of the event greatest under the
    /// canonical ordering, read as one coherent snapshot: both values
    /// reflect the same committed state.
    async fn account_balance(&self, account_id: &str) -> Result<AccountBalance, StoreError>;

    /// All events for the account in canonical order.
    async fn events_for(&self, account_id: &str) -> Result<Vec<LedgerEvent>, StoreError>;

    /// Step-by-step running balance in canonical order. Diagnostic view;
    /// reconciliation itself only needs the scalar aggregate.
    async fn running_balance(&self, account_id: &str) -> Result<Vec<BalanceStep>, StoreError>;
}
