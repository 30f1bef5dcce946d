//! TCP listener with backpressure.
//!
//! # Responsibilities
//! - Bind the gateway address, or wrap a listener the caller already bound
//! - Enforce `max_connections` via semaphore
//! - Hand out a permit that lives as long as the connection

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::bind_addr;

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to accept: {0}")]
    Accept(#[source] std::io::Error),
    #[error("connection limit closed")]
    Closed,
}

/// A TCP listener that bounds concurrent connections.
///
/// When the limit is reached, `accept` waits for a slot before taking the
/// next connection off the queue.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
    max_connections: usize,
}

impl Listener {
    /// Wrap an already bound listener.
    pub fn new(inner: TcpListener, max_connections: usize) -> Self {
        Self {
            inner,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        }
    }

    /// Bind `addr` (`host:port`; an empty host means every interface).
    pub async fn bind(addr: &str, max_connections: usize) -> Result<Self, ListenerError> {
        let resolved = bind_addr(addr).map_err(|err| ListenerError::Bind {
            addr: addr.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, err),
        })?;

        let inner = TcpListener::bind(resolved.as_str()).await.map_err(|source| ListenerError::Bind {
            addr: addr.to_string(),
            source,
        })?;

        tracing::info!(
            address = %resolved,
            max_connections,
            "Listener bound"
        );

        Ok(Self::new(inner, max_connections))
    }

    /// Accept a connection once a slot is free.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        // Permit first (backpressure)
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// A connection slot, released on drop.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}
