//! API handlers.
//!
//! # Endpoints
//!
//! - `POST /events`                              – feed an event into the shadow ledger
//! - `POST /drift-check`                         – reconcile a batch of reported balances
//! - `POST /correct/{account_id}`                – publish a manual correction event
//! - `GET  /accounts/{account_id}/shadow-balance` – current shadow balance
//! - `GET  /accounts/{account_id}/ledger`        – running-balance trace

pub mod balance;
pub mod correction;
pub mod drift;
pub mod extractors;
pub mod feed;
