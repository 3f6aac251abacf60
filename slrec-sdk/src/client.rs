//! HTTP client for the slrec server API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::objects::balance::{BalanceResponse, LedgerTraceResponse};
use crate::objects::correction::{CorrectionAck, ManualCorrectionRequest};
use crate::objects::drift::{BalanceReport, DriftCheckResponse};
use crate::objects::{EventAck, InboundEvent};

/// Errors produced by the SDK HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },
}

/// Client for the reconciliation, correction and balance-query endpoints.
#[derive(Debug, Clone)]
pub struct SlrecClient {
    http: reqwest::Client,
    base_url: String,
}

impl SlrecClient {
    /// Create a client for a server at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// `POST /drift-check` — run a reconciliation pass over a batch of
    /// reported balances.
    pub async fn check_drift(
        &self,
        reports: &[BalanceReport],
    ) -> Result<DriftCheckResponse, ClientError> {
        self.post_json("/drift-check", reports).await
    }

    /// `POST /correct/{account_id}` — publish an operator-triggered
    /// correction event.
    pub async fn manual_correction(
        &self,
        account_id: &str,
        request: &ManualCorrectionRequest,
    ) -> Result<CorrectionAck, ClientError> {
        self.post_json(&format!("/correct/{account_id}"), request)
            .await
    }

    /// `POST /events` — publish an event onto the inbound feed.
    pub async fn publish_event(&self, event: &InboundEvent) -> Result<EventAck, ClientError> {
        self.post_json("/events", event).await
    }

    /// `GET /accounts/{account_id}/shadow-balance`.
    pub async fn shadow_balance(&self, account_id: &str) -> Result<BalanceResponse, ClientError> {
        self.get_json(&format!("/accounts/{account_id}/shadow-balance"))
            .await
    }

    /// `GET /accounts/{account_id}/ledger` — running-balance trace.
    pub async fn ledger_trace(&self, account_id: &str) -> Result<LedgerTraceResponse, ClientError> {
        self.get_json(&format!("/accounts/{account_id}/ledger"))
            .await
    }

    async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ClientError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }
        Ok(response.json().await?)
    }
}
