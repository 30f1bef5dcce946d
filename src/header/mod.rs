//! Header rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! [gateway.header] config
//!     → pattern.rs (one compiled rule per entry)
//!     → rules.rs (removes / ins / outs, first match wins)
//!     → installed into the transcoder as incoming/outgoing matchers
//!       and consulted by the response interceptor
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - Deterministic: same key always yields the same result
//! - Configured patterns always take precedence over the transcoder default

pub mod pattern;
pub mod rules;

pub use pattern::{Pattern, PatternError, Rule};
pub use rules::HeaderRules;
