//! The transcoding mux: an axum router plus the options every transcoded
//! route shares.

use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::MethodRouter;
use axum::Router;
use tower::ServiceExt;

use crate::runtime::forward::{forward_response, ForwardResponseHook};
use crate::runtime::metadata::{default_header_matcher, default_outgoing_header_matcher, IncomingMetadata};
use crate::runtime::unescape::{unescape_request, UnescapingMode};

/// Maps a header key to a metadata key (incoming) or a metadata key to a header
/// key (outgoing). `None` drops the key.
pub type HeaderMatcher = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Options shared by every route of a [`ServeMux`].
#[derive(Clone)]
pub struct MuxOptions {
    incoming: HeaderMatcher,
    outgoing: HeaderMatcher,
    forward_hooks: Vec<Arc<dyn ForwardResponseHook>>,
    unescaping_mode: UnescapingMode,
}

impl Default for MuxOptions {
    fn default() -> Self {
        Self {
            incoming: Arc::new(default_header_matcher),
            outgoing: Arc::new(default_outgoing_header_matcher),
            forward_hooks: Vec::new(),
            unescaping_mode: UnescapingMode::default(),
        }
    }
}

impl fmt::Debug for MuxOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MuxOptions")
            .field("forward_hooks", &self.forward_hooks.len())
            .field("unescaping_mode", &self.unescaping_mode)
            .finish_non_exhaustive()
    }
}

impl MuxOptions {
    pub fn with_incoming_header_matcher<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.incoming = Arc::new(matcher);
        self
    }

    pub fn with_outgoing_header_matcher<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.outgoing = Arc::new(matcher);
        self
    }

    /// Append a hook; hooks run in the order they were added.
    pub fn with_forward_response_hook<H: ForwardResponseHook>(mut self, hook: H) -> Self {
        self.forward_hooks.push(Arc::new(hook));
        self
    }

    pub fn with_unescaping_mode(mut self, mode: UnescapingMode) -> Self {
        self.unescaping_mode = mode;
        self
    }

    pub fn match_incoming(&self, key: &str) -> Option<String> {
        (self.incoming)(key)
    }

    pub fn match_outgoing(&self, key: &str) -> Option<String> {
        (self.outgoing)(key)
    }

    pub fn forward_hooks(&self) -> &[Arc<dyn ForwardResponseHook>] {
        &self.forward_hooks
    }

    pub fn unescaping_mode(&self) -> UnescapingMode {
        self.unescaping_mode
    }
}

/// Collects transcoded routes; turned into a router once registration is done.
pub struct ServeMux {
    router: Router,
    options: Arc<MuxOptions>,
}

impl ServeMux {
    pub fn new(options: MuxOptions) -> Self {
        Self {
            router: Router::new(),
            options: Arc::new(options),
        }
    }

    /// Register a route. Handlers return `Result<Forward<T>, GatewayError>`.
    pub fn route(&mut self, path: &str, method_router: MethodRouter) -> &mut Self {
        self.router = std::mem::take(&mut self.router).route(path, method_router);
        self
    }

    pub fn options(&self) -> &MuxOptions {
        &self.options
    }

    /// Finish the mux: apply the unescaping mode, collect incoming metadata,
    /// forward responses.
    pub fn into_router(self) -> Router {
        let mode = self.options.unescaping_mode();
        let routes = self
            .router
            .layer(middleware::from_fn_with_state(self.options.clone(), forward_response))
            .layer(middleware::from_fn_with_state(self.options, incoming_metadata));

        let service = routes.map_request(move |request: Request| unescape_request(request, mode));
        Router::new().fallback_service(service)
    }
}

impl Default for ServeMux {
    fn default() -> Self {
        Self::new(MuxOptions::default())
    }
}

async fn incoming_metadata(State(options): State<Arc<MuxOptions>>, mut request: Request, next: Next) -> Response {
    let metadata = IncomingMetadata::from_headers(request.headers(), |key| options.match_incoming(key));
    request.extensions_mut().insert(metadata);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{Forward, GatewayError, PathParams};
    use axum::body::{to_bytes, Body};
    use axum::http::StatusCode;
    use axum::routing::get;
    use serde_json::{json, Value};

    async fn show(params: PathParams, metadata: IncomingMetadata) -> Result<Forward<Value>, GatewayError> {
        let name = params.get("name").unwrap_or_default();
        if name == "missing" {
            return Err(tonic::Status::not_found("missing").into());
        }
        let tenant = metadata
            .metadata()
            .get("tenant")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(Forward::new(json!({"name": name, "tenant": tenant})))
    }

    fn router(mode: UnescapingMode) -> Router {
        let mut mux = ServeMux::new(MuxOptions::default().with_unescaping_mode(mode));
        mux.route("/v1/things/{name}", get(show));
        mux.into_router()
    }

    async fn call(router: Router, uri: &str) -> (StatusCode, Value) {
        let request = axum::http::Request::builder()
            .uri(uri)
            .header("grpc-metadata-tenant", "acme")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn routes_with_incoming_metadata() {
        let (status, body) = call(router(UnescapingMode::Legacy), "/v1/things/42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"name": "42", "tenant": "acme"}));
    }

    #[tokio::test]
    async fn maps_rpc_errors() {
        let (status, body) = call(router(UnescapingMode::Legacy), "/v1/things/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 5);
    }

    #[tokio::test]
    async fn legacy_splits_on_escaped_slash() {
        let (status, _) = call(router(UnescapingMode::Legacy), "/v1/things/a%2Fb").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(router(UnescapingMode::Legacy), "/v1/things/a%20b").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "a b");
    }

    #[tokio::test]
    async fn other_modes_decode_params_after_routing() {
        let cases = [
            (UnescapingMode::AllExceptReserved, "a%2Fb%3Ac~d"),
            (UnescapingMode::AllExceptSlash, "a%2Fb:c~d"),
            (UnescapingMode::AllCharacters, "a/b:c~d"),
        ];
        for (mode, expected) in cases {
            let (status, body) = call(router(mode), "/v1/things/a%2Fb%3Ac%7Ed").await;
            assert_eq!(status, StatusCode::OK, "{mode:?}");
            assert_eq!(body["name"], expected, "{mode:?}");
        }
    }
}
