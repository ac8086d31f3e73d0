//! Error types for the AuditFlow API client

use thiserror::Error;

/// Errors returned by the API client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The service answered with a non-success status
    #[error("API error {status} ({code}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// `ERR_*` code from the error body, or `ERR_HTTP_<status>`
        code: String,
        /// Human readable message
        message: String,
        /// Unmet prerequisite step keys, for prerequisite failures
        missing_prerequisites: Vec<String>,
    },

    /// No connection was established, so nothing reached the service
    #[error("Connection error: {0}")]
    Connect(String),

    /// The request failed after it may have reached the service
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// The client could not be constructed
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl ClientError {
    /// Whether repeating the request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Connect(_) | ClientError::Transport(_) => true,
            ClientError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Whether the service certainly did not act on the request
    ///
    /// Only these failures are retried for requests that are not idempotent.
    pub fn is_undelivered(&self) -> bool {
        match self {
            ClientError::Connect(_) => true,
            ClientError::Api { status, .. } => *status == 429,
            _ => false,
        }
    }

    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `ERR_*` code of an API error
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ClientError::Transport(format!("Request timeout: {}", error))
        } else if error.is_connect() {
            ClientError::Connect(error.to_string())
        } else if error.is_decode() {
            ClientError::Decode(error.to_string())
        } else {
            ClientError::Transport(format!("HTTP error: {}", error))
        }
    }
}

/// Result type for API client calls
pub type ClientResult<T> = Result<T, ClientError>;
