//! `echo.Echo` wire types, server and client.
//!
//! Hand-written in the shape `tonic-prost-build` generates for:
//!
//! ```proto
//! package echo;
//! service Echo { rpc Say(EchoRequest) returns (EchoReply); }
//! message EchoRequest { string message = 1; }
//! message EchoReply { string message = 1; }
//! ```

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::codegen::{http, Body, BoxFuture, Service, StdError};
use tonic::transport::Channel;
use tonic::{Request, Response, Status};

pub const SERVICE_NAME: &str = "echo.Echo";
pub const SAY_PATH: &str = "/echo.Echo/Say";

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
pub struct EchoRequest {
    #[prost(string, tag = "1")]
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
pub struct EchoReply {
    #[prost(string, tag = "1")]
    pub message: String,
}

/// Server-side behavior of `echo.Echo`.
#[tonic::async_trait]
pub trait Echo: Send + Sync + 'static {
    async fn say(&self, request: Request<EchoRequest>) -> Result<Response<EchoReply>, Status>;
}

#[derive(Debug)]
pub struct EchoServer<T> {
    inner: Arc<T>,
}

impl<T> EchoServer<T> {
    pub fn new(inner: T) -> Self {
        Self::from_arc(Arc::new(inner))
    }

    pub fn from_arc(inner: Arc<T>) -> Self {
        Self { inner }
    }
}

impl<T> Clone for EchoServer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> tonic::server::NamedService for EchoServer<T> {
    const NAME: &'static str = SERVICE_NAME;
}

struct SaySvc<T>(Arc<T>);

impl<T: Echo> tonic::server::UnaryService<EchoRequest> for SaySvc<T> {
    type Response = EchoReply;
    type Future = BoxFuture<Response<Self::Response>, Status>;

    fn call(&mut self, request: Request<EchoRequest>) -> Self::Future {
        let inner = Arc::clone(&self.0);
        Box::pin(async move { inner.say(request).await })
    }
}

impl<T, B> Service<http::Request<B>> for EchoServer<T>
where
    T: Echo,
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::Body>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<B>) -> Self::Future {
        match request.uri().path() {
            SAY_PATH => {
                let method = SaySvc(Arc::clone(&self.inner));
                Box::pin(async move {
                    let codec = tonic_prost::ProstCodec::default();
                    let mut grpc = tonic::server::Grpc::new(codec);
                    Ok(grpc.unary(method, request).await)
                })
            }
            _ => {
                let status = Status::unimplemented(format!("unknown method {}", request.uri().path()));
                Box::pin(async move { Ok(status.into_http()) })
            }
        }
    }
}

/// Client for `echo.Echo` over a tonic channel.
#[derive(Debug, Clone)]
pub struct EchoClient {
    inner: tonic::client::Grpc<Channel>,
}

impl EchoClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn say(&mut self, request: impl tonic::IntoRequest<EchoRequest>) -> Result<Response<EchoReply>, Status> {
        self.inner
            .ready()
            .await
            .map_err(|err| Status::unknown(format!("Service was not ready: {err}")))?;
        let codec = tonic_prost::ProstCodec::default();
        self.inner
            .unary(request.into_request(), PathAndQuery::from_static(SAY_PATH), codec)
            .await
    }
}
