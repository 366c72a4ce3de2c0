//! Logging initialisation for hosts of the runner.
//!
//! The library crates only emit `tracing` events; installing a subscriber is
//! the host's call. `RUST_LOG` wins over the level passed in.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install a formatted stderr subscriber filtered by `RUST_LOG`, falling back
/// to `default_filter` (e.g. `"info"` or `"swinglab_core=debug"`).
pub fn init_logging(default_filter: &str) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|source| {
            LoggingError::InvalidFilter {
                filter: default_filter.to_string(),
                source,
            }
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}
