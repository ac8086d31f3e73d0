//! AuditFlow Client - typed async access to the AuditFlow HTTP API
//!
//! Transient failures (transport errors, 5xx and 429) are retried with
//! exponential backoff; other 4xx responses are returned immediately.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// HTTP client
pub mod client;

/// Client configuration
pub mod config;

/// Error types
pub mod error;

pub use client::{AuditFlowClient, HealthStatus};
pub use config::{ClientConfig, RetryPolicy};
pub use error::{ClientError, ClientResult};
