//! Header key patterns.
//!
//! # Responsibilities
//! - Match a header or metadata key against one rule
//! - Produce the rewritten key for a match
//!
//! # Design Decisions
//! - Rules are a closed set of tagged variants, so matching is total
//! - Matching is ASCII case-insensitive; HTTP/2 header names are lower-case
//! - Regexes are compiled once, while the configuration is deserialized

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// One matching rule.
#[derive(Debug, Clone)]
pub enum Rule {
    Prefix(String),
    Suffix(String),
    Contains(String),
    Equals(String),
    Regex(Regex),
}

/// A rule plus an optional rewrite of the matched key.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(try_from = "RawPattern", into = "RawPattern")]
pub struct Pattern {
    rule: Rule,
    rewrite: Option<String>,
}

impl Pattern {
    pub fn new(rule: Rule) -> Self {
        let rule = match rule {
            Rule::Prefix(p) => Rule::Prefix(p.to_ascii_lowercase()),
            Rule::Suffix(s) => Rule::Suffix(s.to_ascii_lowercase()),
            Rule::Contains(c) => Rule::Contains(c.to_ascii_lowercase()),
            Rule::Equals(e) => Rule::Equals(e.to_ascii_lowercase()),
            Rule::Regex(r) => Rule::Regex(r),
        };
        Self { rule, rewrite: None }
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::new(Rule::Prefix(prefix.into()))
    }

    pub fn suffix(suffix: impl Into<String>) -> Self {
        Self::new(Rule::Suffix(suffix.into()))
    }

    pub fn contains(needle: impl Into<String>) -> Self {
        Self::new(Rule::Contains(needle.into()))
    }

    pub fn equals(key: impl Into<String>) -> Self {
        Self::new(Rule::Equals(key.into()))
    }

    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self::new(Rule::Regex(regex)))
    }

    /// Replace the matched part of the key with `rewrite`.
    pub fn with_rewrite(mut self, rewrite: impl Into<String>) -> Self {
        self.rewrite = Some(rewrite.into());
        self
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn rewrite(&self) -> Option<&str> {
        self.rewrite.as_deref()
    }

    /// Test `key` against this pattern.
    ///
    /// Returns the lower-cased rewritten key on a match.
    pub fn test(&self, key: &str) -> Option<String> {
        let key = key.to_ascii_lowercase();
        let rewritten = match (&self.rule, self.rewrite.as_deref()) {
            (Rule::Prefix(p), rewrite) => {
                let rest = key.strip_prefix(p.as_str())?;
                rewrite.map(|r| format!("{r}{rest}"))
            }
            (Rule::Suffix(s), rewrite) => {
                let head = key.strip_suffix(s.as_str())?;
                rewrite.map(|r| format!("{head}{r}"))
            }
            (Rule::Contains(c), rewrite) => {
                if !key.contains(c.as_str()) {
                    return None;
                }
                rewrite.map(|r| key.replacen(c.as_str(), r, 1))
            }
            (Rule::Equals(e), rewrite) => {
                if key != *e {
                    return None;
                }
                rewrite.map(str::to_string)
            }
            (Rule::Regex(re), rewrite) => {
                if !re.is_match(&key) {
                    return None;
                }
                rewrite.map(|r| re.replace(&key, r).into_owned())
            }
        };

        Some(rewritten.map_or(key, |k| k.to_ascii_lowercase()))
    }
}

/// Wire form: exactly one rule field plus an optional `rewrite`.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct RawPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    equals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rewrite: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("pattern needs exactly one of prefix, suffix, contains, equals, regex (found {0})")]
    RuleCount(usize),
    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),
}

impl TryFrom<RawPattern> for Pattern {
    type Error = PatternError;

    fn try_from(raw: RawPattern) -> Result<Self, Self::Error> {
        let count = [&raw.prefix, &raw.suffix, &raw.contains, &raw.equals, &raw.regex]
            .iter()
            .filter(|field| field.is_some())
            .count();
        if count != 1 {
            return Err(PatternError::RuleCount(count));
        }

        let pattern = if let Some(p) = raw.prefix {
            Pattern::prefix(p)
        } else if let Some(s) = raw.suffix {
            Pattern::suffix(s)
        } else if let Some(c) = raw.contains {
            Pattern::contains(c)
        } else if let Some(e) = raw.equals {
            Pattern::equals(e)
        } else if let Some(r) = raw.regex {
            Pattern::regex(&r)?
        } else {
            return Err(PatternError::RuleCount(0));
        };

        Ok(match raw.rewrite {
            Some(rewrite) => pattern.with_rewrite(rewrite),
            None => pattern,
        })
    }
}

impl From<Pattern> for RawPattern {
    fn from(pattern: Pattern) -> Self {
        let mut raw = RawPattern {
            rewrite: pattern.rewrite,
            ..Default::default()
        };
        match pattern.rule {
            Rule::Prefix(p) => raw.prefix = Some(p),
            Rule::Suffix(s) => raw.suffix = Some(s),
            Rule::Contains(c) => raw.contains = Some(c),
            Rule::Equals(e) => raw.equals = Some(e),
            Rule::Regex(r) => raw.regex = Some(r.as_str().to_string()),
        }
        raw
    }
}
