//! Forwarding transcoded RPC responses to HTTP clients.
//!
//! # Responsibilities
//! - Carry the RPC message and its metadata out of a gateway handler
//! - Emit metadata accepted by the outgoing matcher as HTTP headers
//! - Run forward-response hooks before the status line is committed
//! - Serialize the message as JSON
//!
//! # Design Decisions
//! - Hooks observe a `ResponseWriter` whose headers freeze once the status is
//!   written, so a hook that writes the status must set its headers first
//! - A hook error aborts forwarding and produces an internal error body

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tonic::Code;
use tower::BoxError;

use crate::runtime::error::{error_body, GatewayError};
use crate::runtime::metadata::{ServerMetadata, GRPC_STATUS_HEADER, METADATA_TRAILER_PREFIX};
use crate::runtime::mux::MuxOptions;

/// A successful transcoded response.
#[derive(Debug, Clone)]
pub struct Forward<T> {
    message: T,
    metadata: Option<ServerMetadata>,
}

impl<T> Forward<T> {
    /// A response with no RPC metadata attached.
    pub fn new(message: T) -> Self {
        Self { message, metadata: None }
    }

    pub fn with_metadata(mut self, metadata: ServerMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl<T> From<tonic::Response<T>> for Forward<T> {
    fn from(response: tonic::Response<T>) -> Self {
        let (metadata, message, _) = response.into_parts();
        Self::new(message).with_metadata(ServerMetadata::from_header(metadata))
    }
}

/// Response extension picked up by the forwarding middleware.
#[derive(Debug, Clone)]
struct Transcoded {
    message: Value,
    metadata: Option<ServerMetadata>,
}

impl<T: Serialize> IntoResponse for Forward<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.message) {
            Ok(message) => {
                let mut response = StatusCode::OK.into_response();
                response.extensions_mut().insert(Transcoded {
                    message,
                    metadata: self.metadata,
                });
                response
            }
            Err(err) => GatewayError(tonic::Status::internal(err.to_string())).into_response(),
        }
    }
}

/// Error for header keys or values that cannot be written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidHeader {
    #[error("invalid header name `{0}`")]
    Name(String),
    #[error("invalid value for header `{0}`")]
    Value(String),
}

/// Response headers and status as seen by forward-response hooks.
///
/// Writing the status flushes the headers: later header mutations are ignored
/// and a second status write is ignored.
#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    header_written: bool,
}

impl ResponseWriter {
    pub fn new(status: StatusCode, headers: HeaderMap) -> Self {
        Self {
            status,
            headers,
            header_written: false,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// Replace every value of `key` with `value`. Opaque bytes (obs-text) are
    /// accepted; control characters are not.
    pub fn set(&mut self, key: &str, value: impl AsRef<[u8]>) -> Result<(), InvalidHeader> {
        let (name, value) = parse(key, value)?;
        if self.flushed(key) {
            return Ok(());
        }
        self.headers.insert(name, value);
        Ok(())
    }

    /// Add a value for `key`, keeping existing ones.
    pub fn append(&mut self, key: &str, value: HeaderValue) -> Result<(), InvalidHeader> {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| InvalidHeader::Name(key.to_string()))?;
        if self.flushed(key) {
            return Ok(());
        }
        self.headers.append(name, value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) {
        if self.flushed(key) {
            return;
        }
        self.headers.remove(key);
    }

    /// Commit the status line.
    pub fn write_header(&mut self, status: StatusCode) {
        if self.header_written {
            tracing::debug!(status = %status, written = %self.status, "Superfluous status write ignored");
            return;
        }
        self.status = status;
        self.header_written = true;
    }

    fn flushed(&self, key: &str) -> bool {
        if self.header_written {
            tracing::debug!(header = %key, "Header change after status write ignored");
        }
        self.header_written
    }

    fn into_response(self, body: Body) -> Response {
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }

    fn fail(mut self, err: BoxError) -> Response {
        tracing::debug!(error = %err, "Forward response hook failed");
        if !self.header_written {
            self.status = StatusCode::INTERNAL_SERVER_ERROR;
        }
        let body = error_body(Code::Internal, &err.to_string()).to_string();
        self.into_response(Body::from(body))
    }
}

fn parse(key: &str, value: impl AsRef<[u8]>) -> Result<(HeaderName, HeaderValue), InvalidHeader> {
    let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| InvalidHeader::Name(key.to_string()))?;
    let value = HeaderValue::from_bytes(value.as_ref()).map_err(|_| InvalidHeader::Value(key.to_string()))?;
    Ok((name, value))
}

/// Hook run on every transcoded response, after metadata headers are emitted
/// and before the body is written.
pub trait ForwardResponseHook: Send + Sync + 'static {
    fn forward(
        &self,
        metadata: Option<&mut ServerMetadata>,
        writer: &mut ResponseWriter,
        message: &Value,
    ) -> Result<(), BoxError>;
}

impl<F> ForwardResponseHook for F
where
    F: Fn(Option<&mut ServerMetadata>, &mut ResponseWriter, &Value) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn forward(
        &self,
        metadata: Option<&mut ServerMetadata>,
        writer: &mut ResponseWriter,
        message: &Value,
    ) -> Result<(), BoxError> {
        self(metadata, writer, message)
    }
}

/// Middleware finishing every transcoded response of a mux.
pub(crate) async fn forward_response(
    State(options): State<Arc<MuxOptions>>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    finish(&options, response)
}

pub(crate) fn finish(options: &MuxOptions, mut response: Response) -> Response {
    let Some(Transcoded { message, mut metadata }) = response.extensions_mut().remove::<Transcoded>() else {
        return response;
    };
    let (parts, _) = response.into_parts();
    let mut writer = ResponseWriter::new(parts.status, parts.headers);

    if let Some(metadata) = &metadata {
        for key in metadata.header.keys() {
            let Some(name) = options.match_outgoing(key.as_str()) else {
                continue;
            };
            for value in metadata.header.get_all(key) {
                if let Err(err) = writer.append(&name, value.clone()) {
                    tracing::debug!(error = %err, "Skipping outgoing metadata");
                }
            }
        }
        for (key, value) in &metadata.trailer {
            let name = format!("{METADATA_TRAILER_PREFIX}{key}");
            if let Err(err) = writer.append(&name, value.clone()) {
                tracing::debug!(error = %err, "Skipping trailer metadata");
            }
        }
    }
    writer.headers.insert(HeaderName::from_static(GRPC_STATUS_HEADER), HeaderValue::from(Code::Ok as i32));
    writer.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for hook in options.forward_hooks() {
        if let Err(err) = hook.forward(metadata.as_mut(), &mut writer, &message) {
            return writer.fail(err);
        }
    }

    match serde_json::to_vec(&message) {
        Ok(body) => writer.into_response(Body::from(body)),
        Err(err) => writer.fail(err.into()),
    }
}
