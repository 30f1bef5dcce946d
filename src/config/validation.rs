//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic, including pattern shape)
//! - Validate listen addresses and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::addr::{AddrError, CanonicalAddr};
use crate::config::schema::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: {source}")]
    Addr {
        field: &'static str,
        #[source]
        source: AddrError,
    },
    #[error("{field}: `{value}` is not a socket address")]
    SocketAddr { field: &'static str, value: String },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(source) = CanonicalAddr::parse(&config.server.addr) {
        errors.push(ValidationError::Addr { field: "server.addr", source });
    }

    if let Some(addr) = config.gateway.as_ref().and_then(|g| g.addr.as_deref()) {
        if let Err(source) = CanonicalAddr::parse(addr) {
            errors.push(ValidationError::Addr { field: "gateway.addr", source });
        }
    }

    if config.server.max_connections == 0 {
        errors.push(ValidationError::Zero { field: "server.max_connections" });
    }

    if config.metrics.enabled && config.metrics.addr.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::SocketAddr {
            field: "metrics.addr",
            value: config.metrics.addr.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
