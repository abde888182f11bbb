//! Server configuration loaded from environment variables.
//!
//! Every setting has a default, so the server starts with no configuration.

use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Socket address for the HTTP API.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Origins allowed to call the API from a browser. Empty means any origin.
    /// Env: `CORS_ALLOWED_ORIGINS` (comma separated)
    pub allowed_origins: Vec<String>,

    /// Number of HTTP worker threads, actix-web picks one per core when unset.
    /// Env: `HTTP_WORKERS`
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            allowed_origins: Vec::new(),
            workers: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(origins) = lookup("CORS_ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(workers) = lookup("HTTP_WORKERS") {
            match workers.parse::<usize>() {
                Ok(n) if n > 0 => config.workers = Some(n),
                _ => tracing::warn!(value = %workers, "Invalid HTTP_WORKERS, using default"),
            }
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }
}
