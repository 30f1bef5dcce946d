//! RPC server with a co-hosted HTTP/JSON gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 RPC GATEWAY                  │
//!                        │                                              │
//!   HTTP/1.1 JSON  ──────┼─▶┌─────────┐   ┌───────┐   ┌─────────────┐   │
//!   h2c RPC        ──────┼─▶│   net   │──▶│ demux │──▶│ RPC routes  │   │
//!                        │  │ serve   │   └───┬───┘   └─────────────┘   │
//!                        │  └─────────┘       │             ▲           │
//!                        │                    ▼             │ loopback  │
//!                        │              ┌───────────┐       │           │
//!                        │              │  runtime  │───────┘           │
//!                        │              │  ServeMux │                   │
//!                        │              └─────┬─────┘                   │
//!                        │                    ▼                         │
//!                        │         header rules + interceptor           │
//!                        │                                              │
//!                        │  config · lifecycle · observability          │
//!                        └──────────────────────────────────────────────┘
//! ```
//!
//! A [`lifecycle::Register`] implementation supplies the RPC services and
//! the transcoded routes; [`lifecycle::Server`] decides whether the gateway
//! shares the RPC port or listens on its own.

pub mod config;
pub mod echo;
pub mod error;
pub mod gateway;
pub mod header;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod runtime;

pub use config::AppConfig;
pub use error::ServerError;
pub use lifecycle::{Register, Running, Server, Shutdown};
