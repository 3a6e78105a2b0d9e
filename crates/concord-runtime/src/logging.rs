//! Tracing subscriber setup
//!
//! Library crates only emit events; installing a subscriber is the driver's
//! call.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::LogConfig;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Install a global `fmt` subscriber per `config`
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| LoggingError::Init(e.to_string()))
}
