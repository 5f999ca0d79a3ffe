//! Servlet context
//!
//! A context is one application mounted under a path prefix. It owns the
//! servlet and filter mappings of that application and the session storage
//! its requests use. Contexts are built once at startup and shared read-only.

use crate::error::ConfigError;
use crate::http::Cookie;
use crate::logger;
use crate::routing::{FilterMapping, ServletMapping, UrlPattern};
use crate::servlet::{HttpResponse, HttpSession, SessionStorage, SESSION_COOKIE_NAME};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

/// Default idle timeout for sessions, 30 minutes
pub const DEFAULT_SESSION_TIMEOUT_SECS: i64 = 1800;

pub struct ServletContext {
    context_path: String,
    servlet_mappings: Vec<ServletMapping>,
    filter_mappings: Vec<FilterMapping>,
    session_storage: Arc<dyn SessionStorage>,
    session_timeout_secs: i64,
    init_params: HashMap<String, String>,
}

impl fmt::Debug for ServletContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServletContext")
            .field("context_path", &self.context_path)
            .field("servlet_mappings", &self.servlet_mappings)
            .field("filter_mappings", &self.filter_mappings)
            .field("session_timeout_secs", &self.session_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl ServletContext {
    /// Path prefix without trailing slash; empty for the root context
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Context-relative part of a request path
    ///
    /// Returns None when the path lies outside this context. The context
    /// root itself maps to `/`.
    pub fn relative_path<'p>(&self, path: &'p str) -> Option<&'p str> {
        let rest = path.strip_prefix(self.context_path.as_str())?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    pub fn servlet_mappings(&self) -> &[ServletMapping] {
        &self.servlet_mappings
    }

    pub fn filter_mappings(&self) -> &[FilterMapping] {
        &self.filter_mappings
    }

    pub fn session_storage(&self) -> &Arc<dyn SessionStorage> {
        &self.session_storage
    }

    pub const fn session_timeout_secs(&self) -> i64 {
        self.session_timeout_secs
    }

    pub fn init_parameter(&self, name: &str) -> Option<&str> {
        self.init_params.get(name).map(String::as_str)
    }

    pub fn init_parameter_names(&self) -> impl Iterator<Item = &str> {
        self.init_params.keys().map(String::as_str)
    }

    /// Path used for the session cookie
    fn cookie_path(&self) -> &str {
        if self.context_path.is_empty() {
            "/"
        } else {
            &self.context_path
        }
    }

    /// Drop expired sessions from this context's storage
    pub fn purge_expired_sessions(&self) -> io::Result<usize> {
        self.session_storage.purge_expired()
    }

    /// Hand a session touched by a request back to storage
    ///
    /// Invalidated sessions are removed and their cookie expired. Live
    /// sessions are persisted; new ones also get their cookie set. A new
    /// session whose response head already went out can never reach the
    /// client, so it is discarded instead of stored.
    pub fn handle_session(&self, session: &HttpSession, response: &mut HttpResponse) -> io::Result<()> {
        if session.is_invalidated() {
            self.session_storage.remove(session.id())?;
            if !session.is_new() {
                let mut cookie = Cookie::new(SESSION_COOKIE_NAME, "");
                cookie.path = Some(self.cookie_path().to_string());
                cookie.max_age = Some(0);
                response.add_cookie(&cookie);
            }
            return Ok(());
        }

        if session.is_new() && response.is_committed() {
            logger::log_warning(&format!(
                "Discarding session {} created after the response was committed",
                session.id()
            ));
            return Ok(());
        }

        self.session_storage.persist(session)?;
        if session.is_new() {
            let mut cookie = Cookie::new(SESSION_COOKIE_NAME, session.id());
            cookie.path = Some(self.cookie_path().to_string());
            cookie.http_only = true;
            response.add_cookie(&cookie);
        }
        Ok(())
    }
}

/// Builder collecting a context's configuration
pub struct ServletContextBuilder {
    context_path: String,
    servlets: Vec<(String, String)>,
    filters: Vec<(String, String)>,
    session_storage: Arc<dyn SessionStorage>,
    session_timeout_secs: i64,
    init_params: HashMap<String, String>,
}

impl ServletContextBuilder {
    pub fn new(context_path: &str, session_storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            context_path: context_path.to_string(),
            servlets: Vec::new(),
            filters: Vec::new(),
            session_storage,
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
            init_params: HashMap::new(),
        }
    }

    #[must_use]
    pub fn servlet(mut self, url_pattern: &str, servlet_class: &str) -> Self {
        self.servlets.push((url_pattern.to_string(), servlet_class.to_string()));
        self
    }

    #[must_use]
    pub fn filter(mut self, url_pattern: &str, filter_class: &str) -> Self {
        self.filters.push((url_pattern.to_string(), filter_class.to_string()));
        self
    }

    #[must_use]
    pub const fn session_timeout_secs(mut self, secs: i64) -> Self {
        self.session_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn init_param(mut self, name: &str, value: &str) -> Self {
        self.init_params.insert(name.to_string(), value.to_string());
        self
    }

    /// Validate the context path and every URL pattern
    pub fn build(self) -> Result<ServletContext, ConfigError> {
        let context_path = normalize_context_path(&self.context_path)?;

        let servlet_mappings = self
            .servlets
            .iter()
            .map(|(pattern, class)| Ok(ServletMapping::new(pattern.parse::<UrlPattern>()?, class)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let filter_mappings = self
            .filters
            .iter()
            .map(|(pattern, class)| Ok(FilterMapping::new(pattern.parse::<UrlPattern>()?, class)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(ServletContext {
            context_path,
            servlet_mappings,
            filter_mappings,
            session_storage: self.session_storage,
            session_timeout_secs: self.session_timeout_secs,
            init_params: self.init_params,
        })
    }
}

/// `/` and `""` become the root context; others must start with `/` and
/// lose any trailing slash
fn normalize_context_path(path: &str) -> Result<String, ConfigError> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if !trimmed.starts_with('/') || trimmed.contains(['*', '?', '#']) {
        return Err(ConfigError::InvalidContextPath(path.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servlet::InMemorySessionStorage;

    fn builder(path: &str) -> ServletContextBuilder {
        ServletContextBuilder::new(path, Arc::new(InMemorySessionStorage::new()))
    }

    #[test]
    fn test_normalize_context_path() {
        assert_eq!(normalize_context_path("/").unwrap(), "");
        assert_eq!(normalize_context_path("").unwrap(), "");
        assert_eq!(normalize_context_path("/app/").unwrap(), "/app");
        assert_eq!(
            normalize_context_path("app"),
            Err(ConfigError::InvalidContextPath("app".to_string()))
        );
        assert!(normalize_context_path("/a*").is_err());
    }

    #[test]
    fn test_build_rejects_invalid_pattern() {
        let result = builder("/app").servlet("no-slash", "x").build();
        assert_eq!(
            result.unwrap_err(),
            ConfigError::InvalidPattern("no-slash".to_string())
        );
        assert!(builder("/").filter("/a/*/b", "f").build().is_err());
    }

    #[test]
    fn test_relative_path() {
        let root = builder("/").build().unwrap();
        assert_eq!(root.relative_path("/index.html"), Some("/index.html"));

        let app = builder("/app").build().unwrap();
        assert_eq!(app.relative_path("/app"), Some("/"));
        assert_eq!(app.relative_path("/app/x"), Some("/x"));
        assert_eq!(app.relative_path("/application"), None);
        assert_eq!(app.relative_path("/other"), None);
    }

    #[test]
    fn test_init_params() {
        let ctx = builder("/").init_param("greeting", "hi").build().unwrap();
        assert_eq!(ctx.init_parameter("greeting"), Some("hi"));
        assert_eq!(ctx.init_parameter("missing"), None);
        assert_eq!(ctx.session_timeout_secs(), DEFAULT_SESSION_TIMEOUT_SECS);
    }

    #[test]
    fn test_handle_new_session_sets_cookie() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let ctx = ServletContextBuilder::new("/app", storage.clone()).build().unwrap();
        let session = HttpSession::new(60);
        let mut response = HttpResponse::new();

        ctx.handle_session(&session, &mut response).unwrap();

        assert_eq!(storage.len(), 1);
        let cookie = response.header("set-cookie").unwrap();
        assert!(cookie.starts_with(&format!("JSESSIONID={}", session.id())));
        assert!(cookie.contains("Path=/app"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[test]
    fn test_handle_existing_session_no_cookie() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let ctx = ServletContextBuilder::new("/", storage.clone()).build().unwrap();
        let mut session = HttpSession::new(60);
        session.touch();
        let mut response = HttpResponse::new();

        ctx.handle_session(&session, &mut response).unwrap();
        assert_eq!(storage.len(), 1);
        assert!(response.header("set-cookie").is_none());
    }

    #[test]
    fn test_handle_invalidated_session() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let ctx = ServletContextBuilder::new("/", storage.clone()).build().unwrap();
        let mut session = HttpSession::new(60);
        storage.persist(&session).unwrap();
        session.touch();
        session.invalidate();
        let mut response = HttpResponse::new();

        ctx.handle_session(&session, &mut response).unwrap();
        assert!(storage.is_empty());
        let cookie = response.header("set-cookie").unwrap();
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Path=/"));
    }

    #[test]
    fn test_new_session_after_commit_is_discarded() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let ctx = ServletContextBuilder::new("/", storage.clone()).build().unwrap();
        let session = HttpSession::new(60);
        let mut response = HttpResponse::new();
        response.print("early");
        response.flush().unwrap();

        ctx.handle_session(&session, &mut response).unwrap();
        assert!(storage.is_empty());
        let head = response.committed_head().unwrap();
        assert!(head.headers.get("set-cookie").is_none());
    }

    #[test]
    fn test_existing_session_after_commit_is_persisted() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let ctx = ServletContextBuilder::new("/", storage.clone()).build().unwrap();
        let mut session = HttpSession::new(60);
        session.touch();
        let mut response = HttpResponse::new();
        response.flush().unwrap();

        ctx.handle_session(&session, &mut response).unwrap();
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_purge_expired_sessions() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let ctx = ServletContextBuilder::new("/", storage.clone()).build().unwrap();
        storage.persist(&HttpSession::new(60)).unwrap();

        assert_eq!(ctx.purge_expired_sessions().unwrap(), 0);
        assert_eq!(storage.len(), 1);
    }
}
