//!
//! AuditFlow Server - HTTP JSON boundary of the compliance workflow engine
//!
//! This module exports all the components of the AuditFlow Server.

/// API module
pub mod api;

/// Server module
pub mod server;

/// Configuration module
pub mod config;

/// Error module
pub mod error;

// Re-export key types
pub use config::{LogFormat, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::AuditFlowServer;

/// Run function
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    let server = AuditFlowServer::in_memory(config)?;
    server.run().await
}

/// Initialize logging
///
/// `RUST_LOG` takes precedence over the configured log level. Warnings
/// collected by `ServerConfig::load` are logged once the subscriber is up.
pub fn init_logging(config: &ServerConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    // Create filter based on config
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Initialize subscriber
    match config.log_format {
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).init(),
        LogFormat::Json => fmt().json().with_env_filter(filter).with_target(true).init(),
    }

    log_config_warnings(config);
}

/// Emit the problems recorded while loading the configuration
fn log_config_warnings(config: &ServerConfig) {
    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_config_warnings_reach_the_subscriber() {
        let config = ServerConfig::from_lookup(|key| match key {
            "SERVER_PORT" => Some("eighty".to_string()),
            "LOG_FORMAT" => Some("xml".to_string()),
            _ => None,
        })
        .unwrap();

        let output = CapturedOutput::default();
        let writer = output.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || log_config_warnings(&config));

        let logged = String::from_utf8(output.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("WARN"), "{}", logged);
        assert!(logged.contains("Invalid SERVER_PORT value: eighty"), "{}", logged);
        assert!(logged.contains("Invalid LOG_FORMAT value: xml"), "{}", logged);
        assert_eq!(config.port, 8000);
    }
}
