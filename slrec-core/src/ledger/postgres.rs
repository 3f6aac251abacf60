//! Postgres-backed ledger store.
//!
//! The SQL keeps the canonical `(occurred_at, event_id)` ordering in the
//! database: the aggregate uses a signed `SUM(CASE …)`, the trace uses a
//! window function over that ordering, and the append relies on the
//! primary key plus `ON CONFLICT DO NOTHING` as a duplicate backstop.

use std::str::FromStr;

use async_trait::async_trait;
use compact_str::CompactString;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use sqlx::postgres::PgRow;

use super::event::{EventKind, LedgerEvent};
use super::store::{AccountBalance, BalanceStep, LedgerStore, StoreError};

/// A `LedgerStore` backed by a Postgres `ledger` table
/// (see `migrations/0001_ledger.sql`).
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_kind(row: &PgRow) -> Result<EventKind, StoreError> {
    let kind: String = row.try_get("kind")?;
    EventKind::from_str(&kind).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn decode_event(row: &PgRow) -> Result<LedgerEvent, StoreError> {
    Ok(LedgerEvent {
        event_id: CompactString::from(row.try_get::<String, _>("event_id")?),
        account_id: CompactString::from(row.try_get::<String, _>("account_id")?),
        kind: decode_kind(row)?,
        amount: row.try_get("amount")?,
        occurred_at: row.try_get("occurred_at")?,
        reason: row.try_get("reason")?,
    })
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    #[tracing::instrument(skip_all, err, name = "SQL:LedgerContainsEvent")]
    async fn contains(&self, event_id: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM ledger WHERE event_id = $1)")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:LedgerAppendEvent")]
    async fn append(&self, event: &LedgerEvent) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO ledger (event_id, account_id, kind, amount, occurred_at, reason)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event.event_id.as_str())
        .bind(event.account_id.as_str())
        .bind(event.kind.as_str())
        .bind(event.amount)
        .bind(event.occurred_at)
        .bind(event.reason.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:LedgerBalanceOf")]
    async fn balance_of(&self, account_id: &str) -> Result<Decimal, StoreError> {
        let balance: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(CASE WHEN kind = 'credit' THEN amount ELSE -amount END), 0)
            FROM ledger
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(balance)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:LedgerAccountBalance")]
    async fn account_balance(&self, account_id: &str) -> Result<AccountBalance, StoreError> {
        // One statement, one snapshot: the aggregate and the subquery see
        // the same committed state.
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN kind = 'credit' THEN amount ELSE -amount END), 0)
                    AS balance,
                (
                    SELECT event_id
                    FROM ledger
                    WHERE account_id = $1
                    ORDER BY occurred_at DESC, event_id DESC
                    LIMIT 1
                ) AS last_event_id
            FROM ledger
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(AccountBalance {
            account_id: CompactString::from(account_id),
            balance: row.try_get("balance")?,
            last_event_id: row
                .try_get::<Option<String>, _>("last_event_id")?
                .map(CompactString::from),
        })
    }

    #[tracing::instrument(skip_all, err, name = "SQL:LedgerEventsFor")]
    async fn events_for(&self, account_id: &str) -> Result<Vec<LedgerEvent>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, account_id, kind, amount, occurred_at, reason
            FROM ledger
            WHERE account_id = $1
            ORDER BY occurred_at ASC, event_id ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_event).collect()
    }

    #[tracing::instrument(skip_all, err, name = "SQL:LedgerRunningBalance")]
    async fn running_balance(&self, account_id: &str) -> Result<Vec<BalanceStep>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                event_id,
                kind,
                amount,
                occurred_at,
                SUM(CASE WHEN kind = 'credit' THEN amount ELSE -amount END)
                    OVER (PARTITION BY account_id ORDER BY occurred_at ASC, event_id ASC)
                    AS running_balance
            FROM ledger
            WHERE account_id = $1
            ORDER BY occurred_at ASC, event_id ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(BalanceStep {
                    event_id: CompactString::from(row.try_get::<String, _>("event_id")?),
                    kind: decode_kind(row)?,
                    amount: row.try_get("amount")?,
                    occurred_at: row.try_get("occurred_at")?,
                    running_balance: row.try_get("running_balance")?,
                })
            })
            .collect()
    }
}
