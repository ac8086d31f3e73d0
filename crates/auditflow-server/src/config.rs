//! Configuration for the AuditFlow Server
//!
//! Defaults are overridden from environment variables. Invalid values keep
//! the default and are recorded in `warnings`, which `init_logging` emits
//! once a subscriber is installed.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use crate::error::{ServerError, ServerResult};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub bind_address: String,

    /// Log level, used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// YAML catalog to load instead of the built-in one
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Origins allowed by CORS; empty allows any origin
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    /// Problems found while loading, not yet logged
    #[serde(skip)]
    pub warnings: Vec<String>,
}

fn default_port() -> u16 {
    8000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_host(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            catalog_path: None,
            cors_allowed_origins: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn load() -> ServerResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> ServerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Start with defaults
        let mut config = Self::default();

        if let Some(port) = lookup("SERVER_PORT") {
            if let Ok(port) = port.trim().parse::<u16>() {
                config.port = port;
            } else {
                config
                    .warnings
                    .push(format!("Invalid SERVER_PORT value: {}", port));
            }
        }

        if let Some(host) = lookup("SERVER_HOST") {
            if host.trim().is_empty() {
                let warning = format!("Empty SERVER_HOST value, keeping {}", config.bind_address);
                config.warnings.push(warning);
            } else {
                config.bind_address = host.trim().to_string();
            }
        }

        if let Some(log_level) = lookup("LOG_LEVEL") {
            config.log_level = log_level;
        }

        if let Some(format) = lookup("LOG_FORMAT") {
            match format.trim().to_ascii_lowercase().as_str() {
                "text" => config.log_format = LogFormat::Text,
                "json" => config.log_format = LogFormat::Json,
                _ => config
                    .warnings
                    .push(format!("Invalid LOG_FORMAT value: {}", format)),
            }
        }

        if let Some(path) = lookup("CATALOG_PATH") {
            if !path.trim().is_empty() {
                config.catalog_path = Some(PathBuf::from(path.trim()));
            }
        }

        if let Some(origins) = lookup("CORS_ALLOWED_ORIGINS") {
            config.cors_allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }

    /// Address the listener binds to
    pub fn socket_addr(&self) -> ServerResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_address, self.port);
        addr.parse().map_err(|e| {
            ServerError::ConfigurationError(format!("Invalid bind address {}: {}", addr, e))
        })
    }
}
