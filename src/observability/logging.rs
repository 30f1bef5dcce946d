//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber once per process
//! - Pick the level from `RUST_LOG`, else from config
//!
//! # Design Decisions
//! - JSON format for production, pretty format for development

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogFormat};

/// Install the subscriber. Fails if one is already installed.
pub fn init(config: &LogConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (json, pretty) = match config.format {
        LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
        LogFormat::Pretty => (None, Some(tracing_subscriber::fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .try_init()
}
