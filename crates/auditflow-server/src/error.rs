//! Error types for the AuditFlow Server
//!
//! This module contains the error types used throughout the server.

use auditflow_core::CoreError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// Error raised by the engine
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Malformed request
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        ServerError::ValidationError(rejection.body_text())
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::InternalError(format!("IO error: {}", err))
    }
}

impl ServerError {
    /// Check if the error is a client-side problem
    pub fn is_client_error(&self) -> bool {
        match self {
            ServerError::ValidationError(_) => true,
            ServerError::Core(err) => !matches!(
                err,
                CoreError::CatalogIntegrity(_)
                    | CoreError::StateStoreError(_)
                    | CoreError::SerializationError(_)
            ),
            _ => false,
        }
    }
}
