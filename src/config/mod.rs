// Configuration module entry point
// Loads static configuration and builds the servlet contexts it describes

mod types;

use crate::error::ConfigError;
use crate::servlet::{InMemorySessionStorage, ServletContext, ServletContextBuilder};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

pub use types::{
    Config, ContextConfig, FilterMappingConfig, HttpConfig, LoggingConfig, ServerConfig,
    ServletMappingConfig,
};

impl Config {
    /// Load configuration from specified file path (extension optional)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("SERVER"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("http.server_name", "Servlet-Hyper/1.0")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Directory receiving uploaded files
    pub fn temp_dir(&self) -> PathBuf {
        self.http
            .temp_dir
            .as_ref()
            .map_or_else(std::env::temp_dir, PathBuf::from)
    }

    /// Build every configured context with its own in-memory session storage
    pub fn build_contexts(&self) -> Result<Vec<Arc<ServletContext>>, ConfigError> {
        let mut seen = HashSet::new();
        let mut contexts = Vec::with_capacity(self.contexts.len());

        for context_config in &self.contexts {
            let context = build_context(context_config)?;
            if !seen.insert(context.context_path().to_string()) {
                return Err(ConfigError::DuplicateContextPath(context_config.path.clone()));
            }
            contexts.push(Arc::new(context));
        }
        Ok(contexts)
    }
}

fn build_context(config: &ContextConfig) -> Result<ServletContext, ConfigError> {
    let mut builder = ServletContextBuilder::new(&config.path, Arc::new(InMemorySessionStorage::new()))
        .session_timeout_secs(config.session_timeout_secs);

    for mapping in &config.servlets {
        builder = builder.servlet(&mapping.url_pattern, &mapping.servlet);
    }
    for mapping in &config.filters {
        builder = builder.filter(&mapping.url_pattern, &mapping.filter);
    }
    for (name, value) in &config.init_params {
        builder = builder.init_param(name, value);
    }
    builder.build()
}
