//! TOML file configuration structures.
//!
//! These structs directly map to the `slrec-config.toml` file format.
//! Every section and field has a default, so a missing file or a partial
//! file both yield a runnable configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub event_log: EventLogConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:3000").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

/// Which ledger store implementation backs the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process store; state is lost on restart.
    #[default]
    Memory,
    /// PostgreSQL via `DATABASE_URL`.
    Postgres,
}

/// Storage configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

/// Event log configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogConfig {
    /// Number of partitions; one consumer worker per partition.
    #[serde(default = "default_partitions")]
    pub partitions: usize,
    /// Per-partition channel buffer.
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            partitions: default_partitions(),
            buffer: default_buffer(),
        }
    }
}

fn default_partitions() -> usize {
    4
}

fn default_buffer() -> usize {
    slrec_core::events::DEFAULT_CHANNEL_BUFFER
}

/// Reconciliation configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Maximum absolute difference still considered a match.
    #[serde(default = "default_tolerance")]
    pub tolerance: Decimal,
    /// Seconds between auto-corrections for the same account; 0 disables
    /// the throttle.
    #[serde(default = "default_cooldown_secs")]
    pub correction_cooldown_secs: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            correction_cooldown_secs: default_cooldown_secs(),
        }
    }
}

fn default_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

fn default_cooldown_secs() -> u64 {
    300
}
