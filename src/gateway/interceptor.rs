//! Response interceptor: RPC metadata → HTTP headers and status.
//!
//! Runs on every transcoded response in two phases. The header phase moves
//! metadata matched by `removes` into plain HTTP headers. The status phase
//! turns the `x-http-code` metadata value into the HTTP status. Headers must
//! be written before the status, because writing the status flushes them.

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use serde_json::Value;
use tower::BoxError;

use crate::header::HeaderRules;
use crate::observability::metrics;
use crate::runtime::{
    ForwardResponseHook, InvalidHeader, ResponseWriter, ServerMetadata, GRPC_STATUS_HEADER,
    METADATA_HEADER_PREFIX,
};

/// Metadata key whose value overrides the HTTP status code.
pub const HTTP_STATUS_HEADER: &str = "x-http-code";

/// Separator for multi-value headers re-emitted by the header phase.
const SPACE: &str = " ";

#[derive(Debug, thiserror::Error)]
pub enum InterceptError {
    #[error(transparent)]
    Header(#[from] InvalidHeader),
    #[error("invalid HTTP status `{value}` in `{HTTP_STATUS_HEADER}` metadata")]
    InvalidStatus { value: String },
}

/// Forward-response hook bridging RPC metadata to the HTTP response.
#[derive(Debug, Clone)]
pub struct ResponseInterceptor {
    rules: Arc<HeaderRules>,
}

impl ResponseInterceptor {
    pub fn new(rules: Arc<HeaderRules>) -> Self {
        Self { rules }
    }

    /// Apply both phases. Missing metadata makes both a no-op.
    pub fn intercept(
        &self,
        metadata: Option<&mut ServerMetadata>,
        writer: &mut ResponseWriter,
    ) -> Result<(), InterceptError> {
        let Some(metadata) = metadata else {
            return Ok(());
        };

        // Order matters: the status write flushes headers.
        self.header(metadata, writer)?;
        self.status(metadata, writer)
    }

    fn header(&self, metadata: &mut ServerMetadata, writer: &mut ResponseWriter) -> Result<(), InterceptError> {
        let keys: Vec<HeaderName> = metadata.header.keys().cloned().collect();
        for key in keys {
            // Reserved for the status phase.
            if key == HTTP_STATUS_HEADER {
                continue;
            }

            let Some(new_key) = self.rules.test_removes(&key.as_str().to_ascii_lowercase()) else {
                continue;
            };

            // Joined as raw bytes so non-ASCII values survive.
            let joined = metadata
                .header
                .get_all(&key)
                .iter()
                .map(HeaderValue::as_bytes)
                .collect::<Vec<_>>()
                .join(SPACE.as_bytes());
            writer.set(&new_key, joined)?;
            metadata.header.remove(&key);
            writer.remove(&format!("{METADATA_HEADER_PREFIX}{key}"));
        }

        Ok(())
    }

    fn status(&self, metadata: &mut ServerMetadata, writer: &mut ResponseWriter) -> Result<(), InterceptError> {
        let Some(value) = metadata.header.get(HTTP_STATUS_HEADER) else {
            return Ok(());
        };

        let raw = String::from_utf8_lossy(value.as_bytes()).into_owned();
        let status = raw
            .parse::<i64>()
            .ok()
            .and_then(|code| u16::try_from(code).ok())
            .and_then(|code| StatusCode::from_u16(code).ok());

        let Some(status) = status else {
            let values: Vec<_> = metadata.header.get_all(HTTP_STATUS_HEADER).iter().collect();
            tracing::warn!(value = ?values, "Status code set incorrectly");
            return Err(InterceptError::InvalidStatus { value: raw });
        };

        metadata.header.remove(HTTP_STATUS_HEADER);
        writer.remove(GRPC_STATUS_HEADER);
        writer.write_header(status);
        metrics::record_status_override(status.as_u16());

        Ok(())
    }
}

impl ForwardResponseHook for ResponseInterceptor {
    fn forward(
        &self,
        metadata: Option<&mut ServerMetadata>,
        writer: &mut ResponseWriter,
        _message: &Value,
    ) -> Result<(), BoxError> {
        self.intercept(metadata, writer).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Pattern;
    use axum::http::HeaderMap;
    use std::sync::Mutex;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Events recorded as `(level, [(field, debug value)])`.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<(Level, Vec<(String, String)>)>>>);

    #[derive(Default)]
    struct Fields(Vec<(String, String)>);

    impl Visit for Fields {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            self.0.push((field.name().to_string(), format!("{value:?}")));
        }
    }

    impl<S: Subscriber> Layer<S> for Captured {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut fields = Fields::default();
            event.record(&mut fields);
            self.0.lock().unwrap().push((*event.metadata().level(), fields.0));
        }
    }

    fn interceptor(removes: Vec<Pattern>) -> ResponseInterceptor {
        ResponseInterceptor::new(Arc::new(HeaderRules::new(removes, Vec::new(), Vec::new())))
    }

    fn metadata(pairs: &[(&'static str, &'static str)]) -> ServerMetadata {
        let mut header = HeaderMap::new();
        for (key, value) in pairs {
            header.append(*key, HeaderValue::from_static(value));
        }
        ServerMetadata::new(header, HeaderMap::new())
    }

    /// Writer as the transcoder leaves it before hooks run.
    fn writer(extra: &[(&'static str, &'static str)]) -> ResponseWriter {
        let mut headers = HeaderMap::new();
        headers.insert(GRPC_STATUS_HEADER, HeaderValue::from_static("0"));
        for (key, value) in extra {
            headers.append(*key, HeaderValue::from_static(value));
        }
        ResponseWriter::new(StatusCode::OK, headers)
    }

    #[test]
    fn status_and_removal() {
        let interceptor = interceptor(vec![Pattern::prefix("x-request-")]);
        let mut md = metadata(&[("x-http-code", "201"), ("x-request-id", "abc")]);
        let mut w = writer(&[("grpc-metadata-x-request-id", "abc")]);

        interceptor.intercept(Some(&mut md), &mut w).unwrap();

        assert_eq!(w.status(), StatusCode::CREATED);
        assert!(w.header_written());
        assert_eq!(w.headers()["x-request-id"], "abc");
        assert!(w.headers().get("grpc-metadata-x-request-id").is_none());
        assert!(w.headers().get(GRPC_STATUS_HEADER).is_none());
        assert!(md.header.is_empty());
    }

    #[test]
    fn unparseable_status() {
        let interceptor = interceptor(Vec::new());
        let mut md = metadata(&[("x-http-code", "oops")]);
        let mut w = writer(&[]);

        let err = interceptor.intercept(Some(&mut md), &mut w).unwrap_err();

        assert!(matches!(err, InterceptError::InvalidStatus { ref value } if value == "oops"));
        assert!(!w.header_written());
        assert_eq!(w.status(), StatusCode::OK);
        assert_eq!(w.headers()[GRPC_STATUS_HEADER], "0");
        assert!(md.header.contains_key(HTTP_STATUS_HEADER));
    }

    #[test]
    fn unparseable_status_logs_a_warning() {
        let interceptor = interceptor(Vec::new());
        let mut md = metadata(&[("x-http-code", "oops")]);
        let mut w = writer(&[]);

        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());
        tracing::subscriber::with_default(subscriber, || {
            assert!(interceptor.intercept(Some(&mut md), &mut w).is_err());
        });

        let events = captured.0.lock().unwrap();
        let (_, fields) = events
            .iter()
            .find(|(level, _)| *level == Level::WARN)
            .expect("a warn event");
        assert!(fields.iter().any(|(name, value)| name == "value" && value.contains("oops")));
        assert!(fields
            .iter()
            .any(|(name, value)| name == "message" && value.contains("Status code set incorrectly")));
    }

    #[test]
    fn valid_status_logs_nothing_at_warn() {
        let interceptor = interceptor(Vec::new());
        let mut md = metadata(&[("x-http-code", "201")]);
        let mut w = writer(&[]);

        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());
        tracing::subscriber::with_default(subscriber, || {
            interceptor.intercept(Some(&mut md), &mut w).unwrap();
        });

        assert!(!captured.0.lock().unwrap().iter().any(|(level, _)| *level == Level::WARN));
    }

    #[test]
    fn out_of_range_status_is_rejected() {
        let interceptor = interceptor(Vec::new());
        for value in ["-1", "70000", "42"] {
            let mut md = metadata(&[("x-http-code", value)]);
            let mut w = writer(&[]);
            assert!(interceptor.intercept(Some(&mut md), &mut w).is_err(), "{value}");
            assert!(!w.header_written());
        }
    }

    #[test]
    fn missing_metadata_is_a_noop() {
        let interceptor = interceptor(vec![Pattern::prefix("x-")]);
        let mut w = writer(&[]);

        interceptor.intercept(None, &mut w).unwrap();
        assert!(!w.header_written());
        assert_eq!(w.headers().len(), 1);
    }

    #[test]
    fn first_status_value_wins() {
        let interceptor = interceptor(Vec::new());
        let mut md = metadata(&[("x-http-code", "202"), ("x-http-code", "oops")]);
        let mut w = writer(&[]);

        interceptor.intercept(Some(&mut md), &mut w).unwrap();
        assert_eq!(w.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn status_key_is_never_removed_as_header() {
        let interceptor = interceptor(vec![Pattern::prefix("x-")]);
        let mut md = metadata(&[("x-http-code", "404")]);
        let mut w = writer(&[]);

        interceptor.intercept(Some(&mut md), &mut w).unwrap();
        assert!(w.headers().get("x-http-code").is_none());
        assert_eq!(w.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn multi_values_are_space_joined_and_renamed() {
        let interceptor = interceptor(vec![Pattern::equals("x-tags").with_rewrite("tags")]);
        let mut md = metadata(&[("x-tags", "a"), ("x-tags", "b,c")]);
        let mut w = writer(&[]);

        interceptor.intercept(Some(&mut md), &mut w).unwrap();
        assert_eq!(w.headers()["tags"], "a b,c");
        assert!(w.headers().get("x-tags").is_none());
    }

    #[test]
    fn non_ascii_values_survive_the_join() {
        let interceptor = interceptor(vec![Pattern::equals("x-name")]);
        let mut header = HeaderMap::new();
        header.append("x-name", HeaderValue::from_bytes(b"caf\xe9").unwrap());
        header.append("x-name", HeaderValue::from_static("ok"));
        let mut md = ServerMetadata::new(header, HeaderMap::new());
        let mut w = writer(&[]);

        interceptor.intercept(Some(&mut md), &mut w).unwrap();
        assert_eq!(w.headers()["x-name"].as_bytes(), b"caf\xe9 ok");
        assert!(md.header.is_empty());
    }

    #[test]
    fn header_failure_skips_status_phase() {
        let interceptor = interceptor(vec![Pattern::equals("x-bad").with_rewrite("bad key")]);
        let mut md = metadata(&[("x-bad", "1"), ("x-http-code", "201")]);
        let mut w = writer(&[]);

        let err = interceptor.intercept(Some(&mut md), &mut w).unwrap_err();
        assert!(matches!(err, InterceptError::Header(InvalidHeader::Name(_))));
        assert!(!w.header_written());
        assert_eq!(w.status(), StatusCode::OK);
    }

    #[test]
    fn headers_land_before_status() {
        let interceptor = interceptor(vec![Pattern::prefix("x-")]);
        let mut md = metadata(&[("x-a", "1"), ("x-http-code", "201"), ("x-z", "2")]);
        let mut w = writer(&[]);

        interceptor.intercept(Some(&mut md), &mut w).unwrap();

        // Any header set after the status write would have been dropped.
        assert!(w.header_written());
        assert_eq!(w.headers()["x-a"], "1");
        assert_eq!(w.headers()["x-z"], "2");
    }

    #[test]
    fn second_pass_is_idempotent() {
        let interceptor = interceptor(vec![Pattern::prefix("x-request-")]);
        let mut md = metadata(&[("x-http-code", "201"), ("x-request-id", "abc"), ("tenant", "t")]);
        let mut w = writer(&[]);

        interceptor.intercept(Some(&mut md), &mut w).unwrap();
        let headers = w.headers().clone();
        let status = w.status();

        interceptor.intercept(Some(&mut md), &mut w).unwrap();
        assert_eq!(w.headers(), &headers);
        assert_eq!(w.status(), status);
        assert_eq!(md.header.len(), 1);
    }
}
