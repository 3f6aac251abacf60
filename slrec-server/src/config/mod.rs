//! Configuration module for slrec-server.
//!
//! Handles loading configuration from the TOML file, CLI arguments, and
//! environment variables.

pub mod file;

use crate::config::file::FileConfig;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Load the configuration file and apply CLI overrides.
///
/// A missing file is not an error: the server runs on defaults so a bare
/// `slrec-server` invocation works out of the box.
pub fn load(
    config_path: impl AsRef<Path>,
    listen_override: Option<SocketAddr>,
) -> Result<FileConfig, ConfigError> {
    let config_path = config_path.as_ref();
    let mut config = if config_path.exists() {
        let content = std::fs::read_to_string(config_path)?;
        toml::from_str(&content)?
    } else {
        tracing::info!(path = %config_path.display(), "config file not found, using defaults");
        FileConfig::default()
    };

    if let Some(listen) = listen_override {
        config.server.listen = listen;
    }

    Ok(config)
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
