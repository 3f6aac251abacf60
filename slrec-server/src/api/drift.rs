//! `POST /drift-check` — reconcile a batch of externally reported
//! balances.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use slrec_core::drift::DriftError;
use slrec_core::ledger::event::MONEY_SCALE;
use slrec_sdk::objects::drift::{BalanceReport, DriftCheckResponse};

use super::extractors::TraceId;
use crate::state::AppState;

/// Run one reconciliation pass over the posted reports.
///
/// Corrections for detected mismatches are published before the response
/// is built, so the returned `correctionEventId`s are already in flight.
pub async fn check_drift(
    State(state): State<AppState>,
    trace: TraceId,
    Json(reports): Json<Vec<BalanceReport>>,
) -> Result<Json<DriftCheckResponse>, DriftApiError> {
    if reports
        .iter()
        .any(|r| r.reported_balance.scale() > MONEY_SCALE)
    {
        return Err(DriftApiError::ExcessiveScale);
    }

    tracing::info!(
        accounts = reports.len(),
        trace_id = trace.as_str(),
        "drift check requested"
    );
    let response = state.detector.check(&reports).await?;
    Ok(Json(response))
}

/// Errors that can occur in the drift-check handler.
#[derive(Debug, thiserror::Error)]
pub enum DriftApiError {
    #[error("{0}")]
    Detector(#[from] DriftError),
    #[error("reported balance scale exceeds {MONEY_SCALE} decimal digits")]
    ExcessiveScale,
}

impl IntoResponse for DriftApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            DriftApiError::Detector(DriftError::EmptyBatch) => (
                StatusCode::BAD_REQUEST,
                "Reconciliation batch must not be empty".to_owned(),
            ),
            DriftApiError::ExcessiveScale => (
                StatusCode::BAD_REQUEST,
                format!("Reported balance scale exceeds {MONEY_SCALE} decimal digits"),
            ),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
