//! RPC metadata carried between the transcoder and gateway handlers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName};
use tonic::metadata::MetadataMap;

/// Prefix of HTTP headers that carry RPC metadata, in both directions.
pub const METADATA_HEADER_PREFIX: &str = "grpc-metadata-";

/// Prefix of HTTP headers that carry RPC trailer metadata.
pub const METADATA_TRAILER_PREFIX: &str = "grpc-trailer-";

/// Prefix applied to permanent HTTP headers forwarded as metadata.
pub const METADATA_PREFIX: &str = "grpcgateway-";

/// Header the transcoder emits to carry the RPC status code.
pub const GRPC_STATUS_HEADER: &str = "grpc-status";

const PERMANENT_HTTP_HEADERS: &[&str] = &[
    "accept",
    "accept-charset",
    "accept-language",
    "accept-ranges",
    "authorization",
    "cache-control",
    "content-type",
    "cookie",
    "date",
    "expect",
    "from",
    "host",
    "if-match",
    "if-modified-since",
    "if-none-match",
    "if-schedule-tag-match",
    "if-unmodified-since",
    "max-forwards",
    "origin",
    "pragma",
    "referer",
    "user-agent",
    "via",
    "warning",
];

/// The transcoder's default header matcher.
///
/// Permanent HTTP headers are forwarded with the `grpcgateway-` prefix, headers
/// with the `grpc-metadata-` prefix are forwarded without it, everything else is
/// rejected.
pub fn default_header_matcher(key: &str) -> Option<String> {
    let key = key.to_ascii_lowercase();
    if PERMANENT_HTTP_HEADERS.contains(&key.as_str()) {
        return Some(format!("{METADATA_PREFIX}{key}"));
    }
    key.strip_prefix(METADATA_HEADER_PREFIX)
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
}

/// The transcoder's default outgoing matcher: every key, prefixed.
pub fn default_outgoing_header_matcher(key: &str) -> Option<String> {
    Some(format!("{METADATA_HEADER_PREFIX}{}", key.to_ascii_lowercase()))
}

/// Metadata returned by the RPC call behind a transcoded response.
///
/// Owned by a single response; the forward-response hooks may mutate it.
#[derive(Debug, Clone, Default)]
pub struct ServerMetadata {
    pub header: HeaderMap,
    pub trailer: HeaderMap,
}

impl ServerMetadata {
    pub fn new(header: HeaderMap, trailer: HeaderMap) -> Self {
        Self { header, trailer }
    }

    pub fn from_header(header: MetadataMap) -> Self {
        Self {
            header: header.into_headers(),
            trailer: HeaderMap::new(),
        }
    }
}

/// Request metadata built from the incoming HTTP headers accepted by the
/// incoming matcher.
#[derive(Debug, Clone, Default)]
pub struct IncomingMetadata(MetadataMap);

impl IncomingMetadata {
    pub fn new(metadata: MetadataMap) -> Self {
        Self(metadata)
    }

    /// Build from HTTP headers, keeping only what `matcher` accepts.
    pub fn from_headers(headers: &HeaderMap, matcher: impl Fn(&str) -> Option<String>) -> Self {
        let mut forwarded = HeaderMap::new();
        for (name, value) in headers {
            let Some(key) = matcher(name.as_str()) else {
                continue;
            };
            match HeaderName::from_bytes(key.as_bytes()) {
                Ok(key) => {
                    forwarded.append(key, value.clone());
                }
                Err(_) => tracing::debug!(header = %name, key = %key, "Dropping unrepresentable metadata key"),
            }
        }
        Self(MetadataMap::from_headers(forwarded))
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.0
    }

    /// Wrap `message` in an RPC request carrying this metadata.
    pub fn into_request<T>(self, message: T) -> tonic::Request<T> {
        tonic::Request::from_parts(self.0, tonic::Extensions::default(), message)
    }
}

impl<S> FromRequestParts<S> for IncomingMetadata
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<IncomingMetadata>().cloned().unwrap_or_default())
    }
}
