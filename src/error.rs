//! Error types
//!
//! One enum per layer. Resolution misses and absent multipart fields are not
//! errors and are represented with `Option` at their call sites.

use std::io;
use thiserror::Error;

/// Failure raised by a servlet or filter, or while constructing one
#[derive(Debug, Error)]
pub enum ServletError {
    /// No factory registered under this class identifier
    #[error("no component registered for class '{0}'")]
    UnknownComponent(String),

    /// The component's `init` hook refused to start
    #[error("unable to initialize '{class}': {reason}")]
    Initialization { class: String, reason: String },

    /// Raised from `service` / `do_filter`
    #[error("{0}")]
    Execution(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ServletError {
    /// Shorthand for handler code
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}

/// Failure while splitting or parsing a multipart body
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultipartError {
    #[error("multipart content type carries no boundary")]
    MissingBoundary,

    #[error("part headers have no Content-Disposition line")]
    MissingDisposition,

    #[error("Content-Disposition has no name parameter")]
    MissingName,

    #[error("malformed multipart body: {0}")]
    Malformed(&'static str),
}

/// Failure while turning a wire request into an [`crate::servlet::HttpRequest`]
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    /// Uploaded file could not be stored
    #[error("unable to store upload: {0}")]
    Io(#[from] io::Error),
}

/// Failure reported by a [`crate::resource::ResourceProvider`]
#[derive(Debug, Error)]
pub enum LoadError {
    /// `load` was called for a path the provider cannot resolve
    #[error("no mapping resolves '{0}', can_load must be checked first")]
    Unresolvable(String),

    /// Construction, initialization or chain failure for this request
    #[error("unexpected situation while processing request: {0}")]
    UnexpectedSituation(#[source] ServletError),

    /// Transport-level failure while flushing
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Invalid configuration detected while building routing contexts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid url pattern '{0}'")]
    InvalidPattern(String),

    #[error("invalid context path '{0}', it must start with '/'")]
    InvalidContextPath(String),

    #[error("context path '{0}' is configured more than once")]
    DuplicateContextPath(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_situation_keeps_source() {
        let err = LoadError::UnexpectedSituation(ServletError::execution("boom"));
        assert!(err.to_string().contains("boom"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_conversion() {
        let err: ServletError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, ServletError::Io(_)));
    }
}
