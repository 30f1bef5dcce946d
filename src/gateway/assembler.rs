//! Builds the gateway router from configuration and user registrations.

use std::sync::Arc;

use axum::Router;
use tonic::transport::Endpoint;
use tower_http::trace::TraceLayer;

use crate::config::{CanonicalAddr, GatewayConfig};
use crate::error::ServerError;
use crate::gateway::interceptor::ResponseInterceptor;
use crate::header::HeaderRules;
use crate::lifecycle::Register;
use crate::runtime::{MuxOptions, ServeMux};

/// Assemble the HTTP/JSON side of the gateway.
///
/// `rpc_addr` is where the RPC server can be reached; an unspecified host is
/// dialed on loopback. Nothing is kept if registration fails.
pub fn assemble<R>(config: &GatewayConfig, register: &R, rpc_addr: &str) -> Result<Router, ServerError>
where
    R: Register + ?Sized,
{
    let rules = Arc::new(HeaderRules::from_config(&config.header));

    let mut options = MuxOptions::default();
    if let Some(unescape) = config.unescape {
        options = options.with_unescaping_mode(unescape.mode);
    }

    let ins = Arc::clone(&rules);
    let outs = Arc::clone(&rules);
    let options = options
        .with_forward_response_hook(ResponseInterceptor::new(rules))
        .with_incoming_header_matcher(move |key| ins.test_ins(key))
        .with_outgoing_header_matcher(move |key| outs.test_outs(key));

    let mut mux = ServeMux::new(options);
    register
        .gateway(&mut mux, dial_endpoint(rpc_addr)?)
        .map_err(ServerError::Registration)?;

    Ok(Router::new()
        .fallback_service(mux.into_router())
        .layer(TraceLayer::new_for_http()))
}

/// Cleartext endpoint for the RPC server at `addr`.
pub fn dial_endpoint(addr: &str) -> Result<Endpoint, ServerError> {
    let uri = format!("http://{}", CanonicalAddr::parse(addr)?.dial());
    Endpoint::from_shared(uri.clone()).map_err(|source| ServerError::Endpoint { uri, source })
}
