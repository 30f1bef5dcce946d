//! Demo service served by the `rpc-gateway` binary.
//!
//! `echo.Echo/Say` returns its message and turns request metadata prefixed
//! `echo-` into response metadata, which makes every gateway path (header
//! removal, status override, outgoing matching) reachable from a plain HTTP
//! client.

pub mod proto;
pub mod register;
pub mod service;

pub use proto::{EchoClient, EchoReply, EchoRequest, EchoServer};
pub use register::EchoRegister;
pub use service::{EchoService, ECHO_METADATA_PREFIX};
