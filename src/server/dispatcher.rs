//! Request dispatcher
//!
//! Runs on a blocking worker. Tries the resource providers in priority
//! order, falls back to error pages and writes the access log entry.

use crate::config::Config;
use crate::logger::{self, AccessLogEntry};
use crate::resource::{ResourceProvider, ServletResourceProvider, StaticResourceProvider};
use crate::servlet::{ComponentRegistry, HttpRequest, HttpResponse};
use hyper::header::SERVER;
use hyper::StatusCode;
use std::sync::Arc;
use std::time::Instant;

pub struct Dispatcher {
    providers: Vec<Box<dyn ResourceProvider>>,
    server_name: String,
    access_log: bool,
    access_log_format: String,
}

impl Dispatcher {
    pub fn new(providers: Vec<Box<dyn ResourceProvider>>, config: &Config) -> Self {
        Self {
            providers,
            server_name: config.http.server_name.clone(),
            access_log: config.logging.access_log,
            access_log_format: config.logging.access_log_format.clone(),
        }
    }

    /// Servlet provider for the configured contexts, then static files if configured
    pub fn from_config(
        config: &Config,
        registry: Arc<ComponentRegistry>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let contexts = config.build_contexts()?;
        for context in &contexts {
            for mapping in context.servlet_mappings() {
                if !registry.has_servlet(&mapping.servlet_class) {
                    logger::log_warning(&format!(
                        "Servlet class '{}' mapped to '{}' is not registered",
                        mapping.servlet_class, mapping.pattern
                    ));
                }
            }
            for mapping in context.filter_mappings() {
                if !registry.has_filter(&mapping.filter_class) {
                    logger::log_warning(&format!(
                        "Filter class '{}' mapped to '{}' is not registered",
                        mapping.filter_class, mapping.pattern
                    ));
                }
            }
        }

        let mut providers: Vec<Box<dyn ResourceProvider>> =
            vec![Box::new(ServletResourceProvider::new(contexts, registry))];
        if let Some(dir) = &config.http.static_dir {
            let provider = StaticResourceProvider::new(dir, config.http.index_files.clone())
                .map_err(|e| format!("Static directory '{dir}': {e}"))?;
            providers.push(Box::new(provider));
        }
        Ok(Self::new(providers, config))
    }

    /// Serve one request to completion
    pub fn dispatch(&self, request: &mut HttpRequest, response: &mut HttpResponse) {
        let started = Instant::now();
        response.set_header(SERVER.as_str(), &self.server_name);

        let path = request.path().to_string();
        match self.providers.iter().find(|p| p.can_load(&path)) {
            Some(provider) => {
                logger::log_debug(&format!("{} provider serves {path}", provider.name()));
                if let Err(e) = provider.load(&path, request, response) {
                    logger::log_error(&format!("{} {path}: {e}", request.method()));
                    if !response.is_committed() {
                        send_error_page(response, StatusCode::INTERNAL_SERVER_ERROR);
                    }
                }
            }
            None => send_error_page(response, StatusCode::NOT_FOUND),
        }

        // Providers release uploads themselves; this covers requests none claimed
        request.release_uploaded_files();

        if self.access_log {
            let mut entry = AccessLogEntry::from_request(request);
            entry.status = response
                .committed_head()
                .map_or_else(|| response.status(), |head| head.status)
                .as_u16();
            entry.body_bytes = response.bytes_sent();
            entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
            logger::log_access(&entry, &self.access_log_format);
        }
    }

    /// Drop expired sessions from every provider, returns the total
    pub fn purge_expired_sessions(&self) -> usize {
        let purged: usize = self.providers.iter().map(|p| p.purge_expired_sessions()).sum();
        if purged > 0 {
            logger::log_debug(&format!("Purged {purged} expired session(s)"));
        }
        purged
    }

    /// Shut every provider down, destroying cached components
    pub fn shutdown(&self) {
        for provider in &self.providers {
            logger::log_info(&format!("Shutting down {} provider", provider.name()));
            provider.shutdown();
        }
    }
}

fn send_error_page(response: &mut HttpResponse, status: StatusCode) {
    response.reset_buffer();
    response.set_status(status.as_u16());
    response.set_content_type("text/html; charset=utf-8");
    let reason = status.canonical_reason().unwrap_or("Error");
    response.print(&format!(
        "<!DOCTYPE html>\n<html><head><title>{code} {reason}</title></head>\
         <body><h1>{code} {reason}</h1></body></html>\n",
        code = status.as_u16()
    ));
    if let Err(e) = response.flush() {
        logger::log_warning(&format!("Unable to send {status} page: {e}"));
    }
}
