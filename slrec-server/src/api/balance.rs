//! `GET /accounts/{account_id}/...` — shadow balance queries.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use slrec_core::ledger::StoreError;
use slrec_sdk::objects::balance::{BalanceResponse, LedgerTraceEntry, LedgerTraceResponse};

use crate::state::AppState;

/// Current shadow balance of an account.
///
/// An account without any ledger rows is a valid query: it reads as
/// balance 0 with `lastEvent` of `"none"`, never 404.
pub async fn shadow_balance(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<BalanceResponse>, BalanceApiError> {
    let balance = state.oracle.balance_of(&account_id).await?;
    Ok(Json(BalanceResponse {
        account_id: balance.account_id,
        balance: balance.balance,
        last_event: balance.last_event_id.unwrap_or_else(|| "none".into()),
    }))
}

/// Step-by-step running balance of an account in canonical order.
pub async fn ledger_trace(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<LedgerTraceResponse>, BalanceApiError> {
    let steps = state.oracle.trace(&account_id).await?;
    let entries = steps
        .into_iter()
        .map(|step| LedgerTraceEntry {
            event_id: step.event_id,
            kind: step.kind.into(),
            amount: step.amount,
            occurred_at: step.occurred_at,
            running_balance: step.running_balance,
        })
        .collect();
    Ok(Json(LedgerTraceResponse {
        account_id: account_id.into(),
        entries,
    }))
}

/// Errors that can occur in the balance query handlers.
#[derive(Debug, thiserror::Error)]
pub enum BalanceApiError {
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl IntoResponse for BalanceApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            BalanceApiError::Storage(e) => {
                tracing::error!(error = %e, "balance query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "Failed to retrieve shadow balance" })),
                )
                    .into_response()
            }
        }
    }
}
