//! Cleartext HTTP accept loop.
//!
//! Each connection is served by hyper's auto builder, which speaks HTTP/1.1
//! and prior-knowledge HTTP/2 (h2c) on the same socket. That is what lets RPC
//! and HTTP/JSON traffic share one port behind the demux.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use tower::Service;

use crate::lifecycle::Shutdown;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Listener, ListenerError};
use crate::observability::metrics;

/// Pause after a failed accept (e.g. file descriptor exhaustion).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Serve `service` on `listener` until `shutdown` fires.
///
/// On shutdown the loop stops accepting, asks every open connection to
/// finish in-flight requests, and waits up to `drain_timeout` for them.
pub async fn serve<S>(listener: Listener, service: S, shutdown: Shutdown, drain_timeout: Duration)
where
    S: Service<Request<Incoming>, Response = Response<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    let tracker = ConnectionTracker::new();
    let mut stop = shutdown.subscribe();

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = stop.recv() => break,
        };

        let (stream, peer_addr, permit) = match accepted {
            Ok(accepted) => accepted,
            Err(ListenerError::Closed) => break,
            Err(err) => {
                tracing::warn!(error = %err, "Accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        metrics::record_connection();
        let guard = tracker.track();
        let service = TowerToHyperService::new(service.clone());
        let mut stop = shutdown.subscribe();

        tokio::spawn(async move {
            let _permit = permit;
            let connection_id = guard.id();
            tracing::debug!(%connection_id, %peer_addr, "Connection opened");

            let builder = auto::Builder::new(TokioExecutor::new());
            let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
            tokio::pin!(conn);

            let mut draining = false;
            loop {
                tokio::select! {
                    result = conn.as_mut() => {
                        if let Err(err) = result {
                            tracing::debug!(%connection_id, error = %err, "Connection error");
                        }
                        break;
                    }
                    _ = stop.recv(), if !draining => {
                        draining = true;
                        conn.as_mut().graceful_shutdown();
                    }
                }
            }

            drop(guard);
        });
    }

    tracing::debug!(active = tracker.active_count(), "Stopped accepting, draining connections");
    if tokio::time::timeout(drain_timeout, tracker.drained()).await.is_err() {
        tracing::warn!(
            active = tracker.active_count(),
            "Drain timeout elapsed with connections still open"
        );
    }
}
