//! `POST /correct/{account_id}` — operator-triggered manual corrections.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use slrec_core::correction::CorrectionGenerator;
use slrec_core::events::PublishError;
use slrec_core::ledger::event::MONEY_SCALE;
use slrec_sdk::objects::correction::{CorrectionAck, ManualCorrectionRequest};

use super::extractors::TraceId;
use crate::state::AppState;

const DEFAULT_REASON: &str = "Manual correction";

/// Publish a manual correction event for an account.
///
/// The correction takes the same path as any upstream event: through the
/// event log and the consumer workers, with the same dedup and
/// non-negativity checks. A debit correction that would overdraw the
/// account is accepted here and rejected at materialization.
pub async fn manual_correction(
    State(state): State<AppState>,
    trace: TraceId,
    Path(account_id): Path<String>,
    Json(body): Json<ManualCorrectionRequest>,
) -> Result<impl IntoResponse, CorrectionApiError> {
    if body.amount <= Decimal::ZERO {
        return Err(CorrectionApiError::NonPositiveAmount);
    }
    if body.amount.scale() > MONEY_SCALE {
        return Err(CorrectionApiError::ExcessiveScale);
    }

    let reason = body.reason.as_deref().unwrap_or(DEFAULT_REASON);
    let event =
        CorrectionGenerator::generate(&account_id, body.kind.into(), body.amount, reason);
    let correction_event_id = event.event_id.clone();

    tracing::info!(
        account_id = %account_id,
        correction_event_id = %correction_event_id,
        kind = %body.kind,
        amount = %body.amount,
        trace_id = trace.as_str(),
        "manual correction requested"
    );
    state.event_log.publish(event).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CorrectionAck {
            message: "Correction event published".to_owned(),
            correction_event_id,
            account_id: account_id.into(),
            kind: body.kind,
            amount: body.amount,
        }),
    ))
}

/// Errors that can occur in the manual correction handler.
#[derive(Debug, thiserror::Error)]
pub enum CorrectionApiError {
    #[error("amount must be greater than 0")]
    NonPositiveAmount,
    #[error("amount scale exceeds {MONEY_SCALE} decimal digits")]
    ExcessiveScale,
    #[error("event log unavailable")]
    Unavailable(#[from] PublishError),
}

impl IntoResponse for CorrectionApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            CorrectionApiError::NonPositiveAmount => (
                StatusCode::BAD_REQUEST,
                "Amount must be greater than 0".to_owned(),
            ),
            CorrectionApiError::ExcessiveScale => (
                StatusCode::BAD_REQUEST,
                format!("Amount scale exceeds {MONEY_SCALE} decimal digits"),
            ),
            CorrectionApiError::Unavailable(e) => {
                tracing::error!(error = %e, "manual correction publish failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Failed to publish correction event".to_owned(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
