//! Routing context resolution
//!
//! Picks the servlet context serving a path by its context path prefix and
//! resolves mappings against the context-relative remainder.

use crate::routing::{matcher, FilterMapping, ServletMapping};
use crate::servlet::ServletContext;
use std::sync::Arc;

/// Resolve the servlet context for a request path
///
/// The longest matching context path wins; the root context (`""`) matches
/// every path. Returns None if no context matches.
pub fn resolve_context<'a>(
    contexts: &'a [Arc<ServletContext>],
    path: &str,
) -> Option<&'a Arc<ServletContext>> {
    contexts
        .iter()
        .filter(|ctx| match_context_path(ctx.context_path(), path))
        .fold(None, |best: Option<&Arc<ServletContext>>, ctx| match best {
            Some(b) if b.context_path().len() >= ctx.context_path().len() => Some(b),
            _ => Some(ctx),
        })
}

/// Match a context path against a request path
///
/// - Root: `""` matches everything
/// - `/app` matches `/app` and `/app/...` but not `/application`
pub fn match_context_path(context_path: &str, path: &str) -> bool {
    if context_path.is_empty() {
        return true;
    }
    path.strip_prefix(context_path)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Servlet mapping for a full request path inside `context`
pub fn resolve_servlet_mapping<'a>(
    context: &'a ServletContext,
    path: &str,
) -> Option<&'a ServletMapping> {
    let relative = context.relative_path(path)?;
    matcher::match_servlet(relative, context.servlet_mappings())
}

/// Every filter mapping for a full request path inside `context`, in
/// configuration order
pub fn resolve_filter_mappings<'a>(context: &'a ServletContext, path: &str) -> Vec<&'a FilterMapping> {
    context
        .relative_path(path)
        .map(|relative| matcher::match_filters(relative, context.filter_mappings()))
        .unwrap_or_default()
}
