//! In-memory ledger store for tests and standalone runs.

use std::collections::HashSet;

use async_trait::async_trait;
use compact_str::CompactString;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::event::LedgerEvent;
use super::store::{AccountBalance, BalanceStep, LedgerStore, StoreError};

#[derive(Default)]
struct Inner {
    events: Vec<LedgerEvent>,
    event_ids: HashSet<CompactString>,
}

/// A `LedgerStore` backed by process memory.
#[derive(Default)]
pub struct MemoryLedgerStore {
    inner: RwLock<Inner>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of persisted rows, across all accounts.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.events.len()
    }
}

impl Inner {
    fn account_events(&self, account_id: &str) -> Vec<LedgerEvent> {
        let mut events: Vec<LedgerEvent> = self
            .events
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.ordering_key().cmp(&b.ordering_key()));
        events
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn contains(&self, event_id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.event_ids.contains(event_id))
    }

    async fn append(&self, event: &LedgerEvent) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.event_ids.insert(event.event_id.clone()) {
            return Ok(false);
        }
        inner.events.push(event.clone());
        Ok(true)
    }

    async fn balance_of(&self, account_id: &str) -> Result<Decimal, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .events
            .iter()
            .filter(|e| e.account_id == account_id)
            .map(LedgerEvent::signed_amount)
            .sum())
    }

    async fn account_balance(&self, account_id: &str) -> Result<AccountBalance, StoreError> {
        // Both values come from one read-lock acquisition, so the pair is a
        // coherent snapshot even with writers in flight.
        let inner = self.inner.read().await;
        let events: Vec<&LedgerEvent> = inner
            .events
            .iter()
            .filter(|e| e.account_id == account_id)
            .collect();
        Ok(AccountBalance {
            account_id: CompactString::from(account_id),
            balance: events.iter().map(|e| e.signed_amount()).sum(),
            last_event_id: events
                .iter()
                .max_by(|a, b| a.ordering_key().cmp(&b.ordering_key()))
                .map(|e| e.event_id.clone()),
        })
    }

    async fn events_for(&self, account_id: &str) -> Result<Vec<LedgerEvent>, StoreError> {
        Ok(self.inner.read().await.account_events(account_id))
    }

    async fn running_balance(&self, account_id: &str) -> Result<Vec<BalanceStep>, StoreError> {
        let events = self.inner.read().await.account_events(account_id);
        let mut running = Decimal::ZERO;
        Ok(events
            .into_iter()
            .map(|e| {
                running += e.signed_amount();
                BalanceStep {
                    event_id: e.event_id,
                    kind: e.kind,
                    amount: e.amount,
                    occurred_at: e.occurred_at,
                    running_balance: running,
                }
            })
            .collect())
    }
}
