//! Per-request split between the RPC server and the gateway on a shared port.

use std::convert::Infallible;
use std::task::{Context, Poll};

use axum::body::{Bytes, HttpBody};
use axum::http::{header, Request, Version};
use axum::response::Response;
use axum::Router;
use tower::util::Oneshot;
use tower::{BoxError, Service, ServiceExt};

use crate::observability::metrics;

const GRPC_CONTENT_TYPE: &str = "application/grpc";

/// RPC traffic is HTTP/2 with a `application/grpc*` content type.
pub fn is_grpc<B>(request: &Request<B>) -> bool {
    request.version() == Version::HTTP_2
        && request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|content_type| content_type.contains(GRPC_CONTENT_TYPE))
}

/// Routes each request to exactly one of two handlers.
#[derive(Debug, Clone)]
pub struct Demux {
    grpc: Router,
    gateway: Router,
}

impl Demux {
    pub fn new(grpc: Router, gateway: Router) -> Self {
        Self { grpc, gateway }
    }
}

impl<B> Service<Request<B>> for Demux
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Oneshot<Router, Request<B>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let target = if is_grpc(&request) {
            metrics::record_dispatch("grpc");
            self.grpc.clone()
        } else {
            metrics::record_dispatch("gateway");
            self.gateway.clone()
        };
        target.oneshot(request)
    }
}
