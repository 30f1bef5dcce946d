//! Startup orchestration.
//!
//! # Responsibilities
//! - Attach RPC services and assemble the gateway
//! - Decide which listeners serve what (see [`Layout`])
//! - Spawn the serving tasks and hand back a [`Running`] handle
//!
//! # Design Decisions
//! - Fail fast: everything fallible happens before the first task is spawned
//! - Serve errors are logged with the server identity; the task then exits

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::service::{Routes, RoutesBuilder};

use crate::config::addr::AddrError;
use crate::config::AppConfig;
use crate::error::ServerError;
use crate::gateway::{assemble, Demux};
use crate::lifecycle::{Register, Shutdown, ShutdownSignal};
use crate::net::{self, Listener};

/// Which listener serves which protocol.
///
/// | gateway | distinct addrs | RPC own listener | HTTP server |
/// |---------|----------------|------------------|-------------|
/// | no      | -              | yes              | no          |
/// | yes     | no             | no               | yes (demux) |
/// | yes     | yes            | yes              | yes         |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    RpcOnly,
    Shared,
    Split,
}

impl Layout {
    pub fn of(config: &AppConfig) -> Result<Self, AddrError> {
        if !config.gateway_enabled() {
            return Ok(Layout::RpcOnly);
        }
        Ok(if config.diff()? { Layout::Split } else { Layout::Shared })
    }

    /// Whether the RPC server serves the caller's listener itself.
    pub fn rpc_listener(self) -> bool {
        self != Layout::Shared
    }

    pub fn http_server(self) -> bool {
        self != Layout::RpcOnly
    }
}

/// Log identity of a serving task.
#[derive(Debug, Clone)]
struct Identity {
    name: String,
    addr: SocketAddr,
}

pub struct Server {
    config: Arc<AppConfig>,
}

impl Server {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Start serving. `listener` is bound to `server.addr` by the caller.
    pub async fn start<R: Register>(&self, register: R, listener: TcpListener) -> Result<Running, ServerError> {
        let layout = Layout::of(&self.config)?;
        let server = &self.config.server;
        let rpc_addr = listener.local_addr()?;

        let mut builder = RoutesBuilder::default();
        register.grpc(&mut builder);
        let routes = builder.routes();

        let gateway = match &self.config.gateway {
            Some(gateway) => Some(assemble(gateway, &register, &rpc_addr.to_string())?),
            None => None,
        };

        let shutdown = Shutdown::new();
        let drain_timeout = Duration::from_secs(server.shutdown_timeout_secs);
        let identity = Identity {
            name: server.name.clone(),
            addr: rpc_addr,
        };

        tracing::info!(name = %server.name, addr = %server.addr, ?layout, "Server starting");

        let (rpc_listener, http_listener) = match layout {
            Layout::RpcOnly => (Some(listener), None),
            Layout::Shared => (None, Some(Listener::new(listener, server.max_connections))),
            Layout::Split => {
                let addr = self.config.gateway_addr().unwrap_or(&server.addr);
                let http = Listener::bind(addr, server.max_connections).await?;
                (Some(listener), Some(http))
            }
        };

        let gateway_addr = match &http_listener {
            Some(listener) => Some(listener.local_addr()?),
            None => None,
        };

        let mut tasks = Vec::new();
        if let Some(listener) = rpc_listener {
            tasks.push(tokio::spawn(serve_rpc(
                routes.clone(),
                listener,
                shutdown.subscribe(),
                identity.clone(),
            )));
        }
        if let (Some(listener), Some(gateway)) = (http_listener, gateway) {
            let demux = Demux::new(routes.into_axum_router(), gateway);
            let identity = Identity {
                addr: gateway_addr.unwrap_or(rpc_addr),
                ..identity
            };
            tracing::info!(name = %identity.name, addr = %identity.addr, "Gateway listening");
            tasks.push(tokio::spawn(net::serve(listener, demux, shutdown.clone(), drain_timeout)));
        }

        Ok(Running {
            layout,
            rpc_addr,
            gateway_addr,
            shutdown,
            tasks,
            drain_timeout,
        })
    }
}

async fn serve_rpc(routes: Routes, listener: TcpListener, mut shutdown: ShutdownSignal, identity: Identity) {
    let result = tonic::transport::Server::builder()
        .add_routes(routes)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move { shutdown.recv().await })
        .await;

    if let Err(err) = result {
        tracing::error!(name = %identity.name, addr = %identity.addr, error = %err, "RPC server exited");
    }
}

/// Handle on the serving tasks.
#[derive(Debug)]
pub struct Running {
    layout: Layout,
    rpc_addr: SocketAddr,
    gateway_addr: Option<SocketAddr>,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
    drain_timeout: Duration,
}

impl Running {
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Address of the listener handed to [`Server::start`].
    pub fn rpc_addr(&self) -> SocketAddr {
        self.rpc_addr
    }

    /// Address of the HTTP server, if any. Equal to `rpc_addr` when shared.
    pub fn gateway_addr(&self) -> Option<SocketAddr> {
        self.gateway_addr
    }

    /// Number of serving tasks.
    pub fn tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Stop accepting, drain connections, and wait for every task.
    pub async fn shutdown(self) {
        self.shutdown.trigger();

        // Serve tasks bound their own drain by the same timeout.
        let deadline = self.drain_timeout + Duration::from_secs(1);
        for task in self.tasks {
            match tokio::time::timeout(deadline, task).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::error!(error = %err, "Serving task failed"),
                Err(_) => tracing::warn!("Serving task did not stop in time"),
            }
        }
        tracing::info!("Shutdown complete");
    }
}
