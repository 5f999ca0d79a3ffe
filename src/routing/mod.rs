//! Routing module
//!
//! Resolves a request path to its routing context, then to the servlet
//! mapping and the ordered filter mappings inside that context. All lookups
//! are pure reads over configuration that is immutable after startup.

mod context;
mod matcher;

pub use context::{
    match_context_path, resolve_context, resolve_filter_mappings, resolve_servlet_mapping,
};
pub use matcher::{match_filters, match_servlet, UrlPattern};

/// URL pattern bound to a servlet class identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServletMapping {
    pub pattern: UrlPattern,
    pub servlet_class: String,
}

impl ServletMapping {
    pub fn new(pattern: UrlPattern, servlet_class: impl Into<String>) -> Self {
        Self {
            pattern,
            servlet_class: servlet_class.into(),
        }
    }
}

/// URL pattern bound to a filter class identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterMapping {
    pub pattern: UrlPattern,
    pub filter_class: String,
}

impl FilterMapping {
    pub fn new(pattern: UrlPattern, filter_class: impl Into<String>) -> Self {
        Self {
            pattern,
            filter_class: filter_class.into(),
        }
    }
}
