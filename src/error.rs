//! Startup errors.

use tower::BoxError;

use crate::config::addr::AddrError;
use crate::net::ListenerError;

/// Failure while starting the servers. Nothing is left serving when returned.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid address: {0}")]
    Config(#[from] AddrError),

    #[error(transparent)]
    Bind(#[from] ListenerError),

    #[error("invalid RPC endpoint `{uri}`: {source}")]
    Endpoint {
        uri: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("gateway registration failed: {0}")]
    Registration(#[source] BoxError),

    #[error("listener I/O: {0}")]
    Io(#[from] std::io::Error),
}
