//! `POST /events` — the inbound event feed.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use slrec_core::events::PublishError;
use slrec_core::ledger::{LedgerEvent, ValidationError};
use slrec_sdk::objects::{EventAck, InboundEvent};

use super::extractors::TraceId;
use crate::state::AppState;

/// Accept an event onto the event log.
///
/// Returns 202: acceptance means "durably enqueued", not "applied". The
/// consumer workers materialize the event asynchronously and redelivered
/// duplicates are absorbed there, so posting the same event twice is
/// harmless.
pub async fn publish_event(
    State(state): State<AppState>,
    trace: TraceId,
    Json(body): Json<InboundEvent>,
) -> Result<impl IntoResponse, FeedError> {
    let event = LedgerEvent::from(body);
    event.validate()?;

    tracing::info!(
        event_id = %event.event_id,
        account_id = %event.account_id,
        trace_id = trace.as_str(),
        "accepting event onto the feed"
    );
    let event_id = event.event_id.clone();
    state.event_log.publish(event).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(EventAck {
            event_id,
            message: "Event accepted".to_owned(),
        }),
    ))
}

/// Errors that can occur on the event feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("{0}")]
    Invalid(#[from] ValidationError),
    #[error("event log unavailable")]
    Unavailable(#[from] PublishError),
}

impl IntoResponse for FeedError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            FeedError::Invalid(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            FeedError::Unavailable(e) => {
                tracing::error!(error = %e, "event feed publish failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Failed to accept event".to_owned(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
