//! URL pattern matching
//!
//! Servlet-style patterns: exact paths (`/login`), path prefixes ending in a
//! wildcard (`/admin/*`, `/*`) and extension patterns (`*.html`). Paths given
//! to the matchers are relative to their routing context.

use crate::error::ConfigError;
use crate::routing::{FilterMapping, ServletMapping};
use std::fmt;
use std::str::FromStr;

/// A parsed URL pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPattern {
    /// Literal path
    Exact(String),
    /// Path prefix, stored without the trailing `/*`; empty for `/*`
    Prefix(String),
    /// File extension, stored without the leading `*.`
    Extension(String),
}

impl UrlPattern {
    /// Check whether a context-relative path matches this pattern
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => path == exact,
            Self::Prefix(prefix) => {
                path.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            }
            Self::Extension(ext) => last_segment(path)
                .rsplit_once('.')
                .is_some_and(|(_, e)| e == ext),
        }
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl FromStr for UrlPattern {
    type Err = ConfigError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidPattern(pattern.to_string());

        if let Some(ext) = pattern.strip_prefix("*.") {
            if ext.is_empty() || ext.contains(['/', '*']) {
                return Err(invalid());
            }
            return Ok(Self::Extension(ext.to_string()));
        }

        if !pattern.starts_with('/') {
            return Err(invalid());
        }

        if let Some(prefix) = pattern.strip_suffix("/*") {
            if prefix.contains('*') {
                return Err(invalid());
            }
            return Ok(Self::Prefix(prefix.to_string()));
        }

        if pattern.contains('*') {
            return Err(invalid());
        }
        Ok(Self::Exact(pattern.to_string()))
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(path) => write!(f, "{path}"),
            Self::Prefix(prefix) => write!(f, "{prefix}/*"),
            Self::Extension(ext) => write!(f, "*.{ext}"),
        }
    }
}

/// Find the servlet mapping for a context-relative path
///
/// Matching priority:
/// 1. Exact path
/// 2. Longest wildcard prefix
/// 3. Extension
///
/// Within one class the first configured mapping wins.
pub fn match_servlet<'a>(path: &str, mappings: &'a [ServletMapping]) -> Option<&'a ServletMapping> {
    // First pass: exact
    if let Some(mapping) = mappings
        .iter()
        .find(|m| matches!(&m.pattern, UrlPattern::Exact(p) if p == path))
    {
        return Some(mapping);
    }

    // Second pass: longest prefix
    let mut best: Option<(&ServletMapping, usize)> = None;
    for mapping in mappings {
        if let UrlPattern::Prefix(prefix) = &mapping.pattern {
            let longer = best.map_or(true, |(_, len)| prefix.len() > len);
            if longer && mapping.pattern.matches(path) {
                best = Some((mapping, prefix.len()));
            }
        }
    }
    if let Some((mapping, _)) = best {
        return Some(mapping);
    }

    // Third pass: extension
    mappings
        .iter()
        .find(|m| matches!(m.pattern, UrlPattern::Extension(_)) && m.pattern.matches(path))
}

/// All filter mappings matching a context-relative path, in configuration order
pub fn match_filters<'a>(path: &str, mappings: &'a [FilterMapping]) -> Vec<&'a FilterMapping> {
    mappings
        .iter()
        .filter(|m| m.pattern.matches(path))
        .collect()
}
