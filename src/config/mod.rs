//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, patterns compiled here)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc with the gateway and the lifecycle orchestrator
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; header rules are never mutated while serving
//! - All fields have defaults to allow minimal configs
//! - The gateway is enabled by the presence of its block, not by a flag

pub mod addr;
pub mod loader;
pub mod schema;
pub mod validation;

pub use addr::{bind_addr, CanonicalAddr};
pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AppConfig, GatewayConfig, HeaderConfig, LogConfig, LogFormat, MetricsConfig, ServerConfig,
    UnescapeConfig,
};
