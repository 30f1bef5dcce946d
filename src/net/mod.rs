//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limit)
//!     → connection.rs (ID, drain tracking)
//!     → serve.rs (HTTP/1.1 + h2c, graceful shutdown)
//!     → Hand off to the demux / gateway router
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - Cleartext only; TLS is terminated in front of the process

pub mod connection;
pub mod listener;
pub mod serve;

pub use listener::{Listener, ListenerError};
pub use serve::serve;
