//! HTTP/JSON gateway in front of the RPC server.
//!
//! # Data Flow
//! ```text
//! Shared port:
//!     TCP (HTTP/1.1 or h2c)
//!         → demux.rs (HTTP/2 + application/grpc* ?)
//!             yes → RPC routes
//!             no  → gateway router (assembler.rs)
//!
//! Gateway router:
//!     ServeMux (incoming matcher = test_ins)
//!         → registered route calls the RPC server over loopback
//!         → outgoing matcher = test_outs
//!         → interceptor.rs (header phase, then status phase)
//! ```
//!
//! # Design Decisions
//! - The demux decides on request headers only; bodies are never buffered
//! - Header rules are built once and shared read-only by every request
//! - Interceptor failures surface as transcoder errors, never panics

pub mod assembler;
pub mod demux;
pub mod interceptor;

pub use assembler::{assemble, dial_endpoint};
pub use demux::{is_grpc, Demux};
pub use interceptor::{InterceptError, ResponseInterceptor, HTTP_STATUS_HEADER};
