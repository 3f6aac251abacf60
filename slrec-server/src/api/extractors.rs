//! Custom Axum extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

/// Header carrying the caller's correlation id.
pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// Optional correlation id taken from the `X-Trace-Id` header.
///
/// Never rejects; an absent or non-ASCII header reads as `"-"` so log
/// lines keep a stable shape.
pub struct TraceId(Option<String>);

impl TraceId {
    pub fn as_str(&self) -> &str {
        self.0.as_deref().unwrap_or("-")
    }
}

impl<S: Send + Sync> FromRequestParts<S> for TraceId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let trace_id = parts
            .headers
            .get(TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        Ok(TraceId(trace_id))
    }
}
