//! The header rule engine.
//!
//! Three ordered pattern lists evaluated first-match-wins. `test_ins` and
//! `test_outs` consult the transcoder's default matcher only when no configured
//! pattern matched, so a configured match overrides a default rejection.

use crate::config::schema::{default_ins, HeaderConfig};
use crate::header::Pattern;
use crate::runtime::default_header_matcher;

/// Compiled, read-only header rules.
#[derive(Debug, Clone, Default)]
pub struct HeaderRules {
    removes: Vec<Pattern>,
    ins: Vec<Pattern>,
    outs: Vec<Pattern>,
}

impl HeaderRules {
    pub fn new(removes: Vec<Pattern>, ins: Vec<Pattern>, outs: Vec<Pattern>) -> Self {
        Self { removes, ins, outs }
    }

    pub fn from_config(config: &HeaderConfig) -> Self {
        let ins = if config.ins.is_empty() {
            default_ins()
        } else {
            config.ins.clone()
        };
        Self::new(config.removes.clone(), ins, config.outs.clone())
    }

    /// First match in `removes`. A match marks the key for removal from the RPC
    /// metadata and re-emission under the returned name.
    pub fn test_removes(&self, key: &str) -> Option<String> {
        first_match(&self.removes, key)
    }

    /// Incoming HTTP header → RPC metadata key.
    pub fn test_ins(&self, key: &str) -> Option<String> {
        first_match(&self.ins, key).or_else(|| default_header_matcher(key))
    }

    /// Outgoing RPC metadata key → HTTP header.
    pub fn test_outs(&self, key: &str) -> Option<String> {
        first_match(&self.outs, key).or_else(|| default_header_matcher(key))
    }
}

/// Evaluate `patterns` left to right; the first match wins.
pub fn first_match(patterns: &[Pattern], key: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| pattern.test(key))
}
