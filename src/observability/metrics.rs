//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_dispatch_total` (counter): shared-port requests by `target` (`grpc`, `gateway`)
//! - `gateway_status_override_total` (counter): responses whose status came from metadata, by `code`
//! - `gateway_connections_total` (counter): accepted HTTP connections
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_dispatch(target: &'static str) {
    metrics::counter!("gateway_dispatch_total", "target" => target).increment(1);
}

pub fn record_status_override(code: u16) {
    metrics::counter!("gateway_status_override_total", "code" => code.to_string()).increment(1);
}

pub fn record_connection() {
    metrics::counter!("gateway_connections_total").increment(1);
}
