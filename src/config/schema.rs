//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::config::addr::{AddrError, CanonicalAddr};
use crate::header::Pattern;
use crate::runtime::UnescapingMode;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// RPC server identity and listen address.
    pub server: ServerConfig,

    /// HTTP/JSON gateway. The gateway is enabled iff this block exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,

    /// Logging settings.
    pub log: LogConfig,

    /// Prometheus exporter settings.
    pub metrics: MetricsConfig,
}

impl AppConfig {
    /// Whether the gateway block is present.
    pub fn gateway_enabled(&self) -> bool {
        self.gateway.is_some()
    }

    /// Address the gateway HTTP server listens on. Falls back to the RPC address.
    pub fn gateway_addr(&self) -> Option<&str> {
        self.gateway
            .as_ref()
            .map(|gateway| gateway.addr.as_deref().unwrap_or(&self.server.addr))
    }

    /// True iff the gateway and the RPC server listen on distinct addresses.
    ///
    /// Addresses are canonicalized first, so `:8080` and `0.0.0.0:8080` are the same.
    pub fn diff(&self) -> Result<bool, AddrError> {
        let Some(gateway_addr) = self.gateway_addr() else {
            return Ok(false);
        };
        let rpc = CanonicalAddr::parse(&self.server.addr)?;
        let gateway = CanonicalAddr::parse(gateway_addr)?;
        Ok(rpc != gateway)
    }
}

/// RPC server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Identifier used in log records.
    pub name: String,

    /// Listen address (`host:port`).
    pub addr: String,

    /// Maximum concurrent connections accepted by the HTTP server.
    pub max_connections: usize,

    /// How long shutdown waits for in-flight connections.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "rpc-gateway".to_string(),
            addr: "0.0.0.0:9090".to_string(),
            max_connections: 10_000,
            shutdown_timeout_secs: 10,
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Dedicated gateway address. Absent means shared with `server.addr`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addr: Option<String>,

    /// URL path unescaping policy handed to the transcoder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unescape: Option<UnescapeConfig>,

    /// Header rewriting rules.
    pub header: HeaderConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default)]
pub struct UnescapeConfig {
    #[serde(default)]
    pub mode: UnescapingMode,
}

/// The three ordered match lists of the header rule engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HeaderConfig {
    /// Metadata keys removed from the RPC response and re-emitted as plain HTTP headers.
    pub removes: Vec<Pattern>,

    /// Incoming HTTP headers forwarded as RPC metadata. Empty means [`default_ins`].
    pub ins: Vec<Pattern>,

    /// Outgoing RPC metadata forwarded as HTTP headers.
    pub outs: Vec<Pattern>,
}

/// Incoming match list used when `ins` is absent or empty.
pub fn default_ins() -> Vec<Pattern> {
    vec![Pattern::prefix("X-Forwarded")]
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    pub level: String,

    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the Prometheus scrape endpoint.
    pub enabled: bool,

    /// Scrape endpoint bind address.
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "127.0.0.1:9100".to_string(),
        }
    }
}
