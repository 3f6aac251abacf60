#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod correction;
pub mod drift;
pub mod events;
pub mod ledger;
pub mod materializer;
pub mod oracle;
pub mod processors;
