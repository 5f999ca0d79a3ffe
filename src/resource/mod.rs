//! Resource providers
//!
//! The dispatcher asks each provider in priority order whether it can serve
//! a path and hands the request to the first one that can.

mod servlet_provider;
mod static_provider;

use crate::error::LoadError;
use crate::servlet::{HttpRequest, HttpResponse};

pub use servlet_provider::{terminate, ServletResourceProvider};
pub use static_provider::StaticResourceProvider;

pub trait ResourceProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Whether `load` would find something to serve for `path`
    ///
    /// Must be cheap and free of side effects.
    fn can_load(&self, path: &str) -> bool;

    /// Serve `path` into `response`
    ///
    /// Only called after `can_load` returned true for the same path.
    fn load(&self, path: &str, request: &mut HttpRequest, response: &mut HttpResponse) -> Result<(), LoadError>;

    /// Drop expired sessions held on behalf of this provider's requests
    fn purge_expired_sessions(&self) -> usize {
        0
    }

    /// Release everything the provider holds
    fn shutdown(&self) {}
}
