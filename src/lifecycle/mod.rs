//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Register.grpc → assemble gateway → log {name, addr} → spawn serving tasks
//!
//! Shutdown (shutdown.rs):
//!     trigger → stop accept → drain connections → tasks exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → caller triggers graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then gateway, then listeners
//! - Shutdown has a timeout: stragglers are abandoned after the deadline

pub mod register;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use register::Register;
pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::wait_for_signal;
pub use startup::{Layout, Running, Server};
