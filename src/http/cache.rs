//! HTTP cache validation
//!
//! `ETag` generation for static content and the `Cache-Control` policies the
//! providers apply.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

/// Weak `ETag` derived from file size and modification time
pub fn file_etag(len: u64, modified: Option<SystemTime>) -> String {
    let mut hasher = DefaultHasher::new();
    len.hash(&mut hasher);
    modified.hash(&mut hasher);
    format!("W/\"{:x}-{len:x}\"", hasher.finish())
}

/// Whether the client's `If-None-Match` covers `etag`
///
/// Handles lists (`"a", "b"`) and the `*` wildcard.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag
            .split(',')
            .map(str::trim)
            .any(|e| e == etag || e == "*")
    })
}

/// `Cache-Control` policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Shared caches may keep the response for `max-age` seconds
    Public(u32),
    /// Revalidate on every use; servlet output default
    NoCache,
}

impl CachePolicy {
    pub fn to_header_value(self) -> String {
        match self {
            Self::Public(max_age) => format!("public, max-age={max_age}"),
            Self::NoCache => "no-cache".to_string(),
        }
    }
}
