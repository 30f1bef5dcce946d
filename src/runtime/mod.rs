//! HTTP/JSON → RPC transcoding runtime.
//!
//! # Data Flow
//! ```text
//! HTTP request
//!     → unescape.rs (legacy mode decodes the path before routing)
//!     → mux.rs (route lookup; incoming matcher builds request metadata)
//!     → registered handler (PathParams decodes captures per mode)
//!       calls the RPC server, returns Forward<T>
//!     → forward.rs (outgoing matcher, forward-response hooks, JSON body)
//!     → HTTP response
//!
//! RPC error:
//!     handler returns GatewayError(Status)
//!     → error.rs (RPC code → HTTP status, JSON error body)
//! ```
//!
//! # Design Decisions
//! - Routes are registered by user code; nothing here knows service schemas
//! - Metadata travels with the response, never through shared state
//! - Matchers and hooks are fixed when the mux is built

pub mod error;
pub mod forward;
pub mod metadata;
pub mod mux;
pub mod unescape;

pub use error::{http_status_from_code, GatewayError};
pub use forward::{Forward, ForwardResponseHook, InvalidHeader, ResponseWriter};
pub use metadata::{
    default_header_matcher, default_outgoing_header_matcher, IncomingMetadata, ServerMetadata,
    GRPC_STATUS_HEADER, METADATA_HEADER_PREFIX, METADATA_PREFIX, METADATA_TRAILER_PREFIX,
};
pub use mux::{HeaderMatcher, MuxOptions, ServeMux};
pub use unescape::{unescape_param, unescape_path, PathParams, UnescapingMode};
