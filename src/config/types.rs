// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::collections::HashMap;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    /// Mounted servlet applications
    #[serde(default)]
    pub contexts: Vec<ContextConfig>,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// error, warn, info or debug
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    /// Request bodies above this size are rejected with 413
    pub max_body_size: u64,
    /// Directory for uploaded files (system temp dir if not set)
    #[serde(default)]
    pub temp_dir: Option<String>,
    /// Directory served when no servlet claims a path
    #[serde(default)]
    pub static_dir: Option<String>,
    #[serde(default = "default_index_files")]
    pub index_files: Vec<String>,
}

fn default_index_files() -> Vec<String> {
    vec!["index.html".to_string(), "index.htm".to_string()]
}

/// One servlet application
#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    /// Context path, `/` for the root context
    pub path: String,
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: i64,
    #[serde(default)]
    pub init_params: HashMap<String, String>,
    /// Servlet mappings in priority order for ties
    #[serde(default)]
    pub servlets: Vec<ServletMappingConfig>,
    /// Filter mappings in execution order
    #[serde(default)]
    pub filters: Vec<FilterMappingConfig>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_session_timeout() -> i64 {
    crate::servlet::DEFAULT_SESSION_TIMEOUT_SECS
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServletMappingConfig {
    pub url_pattern: String,
    pub servlet: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FilterMappingConfig {
    pub url_pattern: String,
    pub filter: String,
}
