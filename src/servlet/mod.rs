//! Servlet processing
//!
//! Component traits, the request/response pair handed to them, sessions,
//! uploaded files, the per-request filter chain and the instance cache that
//! keeps one initialized component per (class, context).

mod container;
mod context;
mod filter_chain;
mod registry;
mod request;
mod response;
mod session;
mod uploaded_file;

use crate::error::ServletError;
use std::sync::Arc;

pub use container::ServletContainer;
pub use context::{ServletContext, ServletContextBuilder, DEFAULT_SESSION_TIMEOUT_SECS};
pub use filter_chain::{ChainState, FilterChain};
pub use registry::ComponentRegistry;
pub use request::HttpRequest;
pub use response::{HttpResponse, ResponseHead, ResponseSink};
pub use session::{HttpSession, InMemorySessionStorage, SessionStorage, SESSION_COOKIE_NAME};
pub use uploaded_file::UploadedFile;

/// Application request handler
///
/// One instance serves every request of its context concurrently, so any
/// internal state needs its own synchronization.
pub trait Servlet: Send + Sync {
    /// Called once, before the first request
    fn init(&mut self, _config: &ServletConfig) -> Result<(), ServletError> {
        Ok(())
    }

    fn service(&self, request: &mut HttpRequest, response: &mut HttpResponse) -> Result<(), ServletError>;

    /// Called once on shutdown
    fn destroy(&self) {}
}

/// Interceptor run before the servlet
///
/// A filter continues the chain by calling [`FilterChain::do_filter`]; not
/// calling it ends the request without reaching the servlet.
pub trait Filter: Send + Sync {
    fn init(&mut self, _config: &FilterConfig) -> Result<(), ServletError> {
        Ok(())
    }

    fn do_filter(
        &self,
        request: &mut HttpRequest,
        response: &mut HttpResponse,
        chain: &mut FilterChain,
    ) -> Result<(), ServletError>;

    fn destroy(&self) {}
}

/// Initialization data handed to a component
#[derive(Debug, Clone)]
pub struct ServletConfig {
    class_name: String,
    context: Arc<ServletContext>,
}

/// Filters are configured the same way servlets are
pub type FilterConfig = ServletConfig;

impl ServletConfig {
    pub fn new(class_name: &str, context: Arc<ServletContext>) -> Self {
        Self {
            class_name: class_name.to_string(),
            context,
        }
    }

    /// Class identifier the component was registered under
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub const fn servlet_context(&self) -> &Arc<ServletContext> {
        &self.context
    }

    /// Context-level init parameter
    pub fn init_parameter(&self, name: &str) -> Option<&str> {
        self.context.init_parameter(name)
    }
}
