//! Servlet resource provider
//!
//! Resolves a path to its context and servlet mapping, runs the filter chain
//! built from the context's filter mappings and finalizes the response.

use crate::error::{LoadError, ServletError};
use crate::http::cache::CachePolicy;
use crate::logger;
use crate::resource::ResourceProvider;
use crate::routing::{resolve_context, resolve_filter_mappings, resolve_servlet_mapping};
use crate::servlet::{
    ComponentRegistry, FilterChain, HttpRequest, HttpResponse, ServletContainer, ServletContext,
};
use hyper::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use std::io;
use std::sync::Arc;

const DEFAULT_CONTENT_TYPE: &str = "text/html";

pub struct ServletResourceProvider {
    contexts: Vec<Arc<ServletContext>>,
    container: ServletContainer,
}

impl ServletResourceProvider {
    pub fn new(contexts: Vec<Arc<ServletContext>>, registry: Arc<ComponentRegistry>) -> Self {
        Self {
            contexts,
            container: ServletContainer::new(registry),
        }
    }

    pub fn contexts(&self) -> &[Arc<ServletContext>] {
        &self.contexts
    }

    pub const fn container(&self) -> &ServletContainer {
        &self.container
    }

    /// Instantiate the servlet and filters, then run the chain
    fn execute(
        &self,
        context: &Arc<ServletContext>,
        servlet_class: &str,
        path: &str,
        request: &mut HttpRequest,
        response: &mut HttpResponse,
    ) -> Result<(), ServletError> {
        let servlet = self.container.get_servlet(servlet_class, context)?;
        response.set_status(200);

        let filters = resolve_filter_mappings(context, path)
            .into_iter()
            .map(|mapping| self.container.get_filter(&mapping.filter_class, context))
            .collect::<Result<Vec<_>, _>>()?;

        let mut chain = FilterChain::new(filters, servlet);
        chain.execute(request, response)
    }
}

impl ResourceProvider for ServletResourceProvider {
    fn name(&self) -> &'static str {
        "servlet"
    }

    fn can_load(&self, path: &str) -> bool {
        resolve_context(&self.contexts, path)
            .is_some_and(|context| resolve_servlet_mapping(context, path).is_some())
    }

    fn load(&self, path: &str, request: &mut HttpRequest, response: &mut HttpResponse) -> Result<(), LoadError> {
        let Some((context, mapping)) = resolve_context(&self.contexts, path)
            .and_then(|context| resolve_servlet_mapping(context, path).map(|m| (context, m)))
        else {
            logger::log_error(&format!("load called for unresolvable path '{path}'"));
            request.release_uploaded_files();
            return Err(LoadError::Unresolvable(path.to_string()));
        };

        request.set_servlet_context(Arc::clone(context));
        match self.execute(context, &mapping.servlet_class, path, request, response) {
            Ok(()) => terminate(context, request, response).map_err(LoadError::from),
            Err(e) => {
                request.release_uploaded_files();
                Err(LoadError::UnexpectedSituation(e))
            }
        }
    }

    fn purge_expired_sessions(&self) -> usize {
        self.contexts
            .iter()
            .map(|context| match context.purge_expired_sessions() {
                Ok(purged) => purged,
                Err(e) => {
                    logger::log_error(&format!(
                        "Unable to purge sessions of context '{}': {e}",
                        context.context_path()
                    ));
                    0
                }
            })
            .sum()
    }

    fn shutdown(&self) {
        self.container.shutdown();
    }
}

/// Finish a request that ran through its chain
///
/// Releases uploads, hands a touched session back to its context, fills in
/// default headers the servlet left unset and commits the response. Session
/// storage failures are logged; flush failures are returned.
pub fn terminate(context: &ServletContext, request: &mut HttpRequest, response: &mut HttpResponse) -> io::Result<()> {
    request.release_uploaded_files();

    if let Some(session) = request.session() {
        if let Err(e) = context.handle_session(session, response) {
            logger::log_error(&format!("Unable to store session {}: {e}", session.id()));
        }
    }

    if !response.is_committed() {
        if !response.contains_header(CONTENT_TYPE.as_str()) {
            response.set_content_type(DEFAULT_CONTENT_TYPE);
        }
        if !response.contains_header(CACHE_CONTROL.as_str()) {
            response.set_header(CACHE_CONTROL.as_str(), &CachePolicy::NoCache.to_header_value());
        }
        if !response.contains_header(PRAGMA.as_str()) {
            response.set_header(PRAGMA.as_str(), "no-cache");
        }
    }

    response.flush()
}
