//! Error handling for the AuditFlow Server API
//!
//! Every error leaves the server as
//! `{"error": msg, "errorDetails": {"errorCode": "ERR_…", "errorMessage": msg}}`.

use auditflow_core::CoreError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::{error, warn};

use crate::error::ServerError;

impl ServerError {
    /// HTTP status and stable error code for the error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::ValidationError(_) => (StatusCode::BAD_REQUEST, "ERR_VALIDATION_ERROR"),
            ServerError::ConfigurationError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ERR_CONFIGURATION_ERROR")
            }
            ServerError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ERR_INTERNAL_SERVER_ERROR")
            }
            ServerError::Core(err) => match err {
                CoreError::ValidationError(_) => (StatusCode::BAD_REQUEST, "ERR_VALIDATION_ERROR"),
                CoreError::ClientNotFound(_) => (StatusCode::NOT_FOUND, "ERR_NOT_FOUND_CLIENT"),
                CoreError::WorkflowNotFound(_) => (StatusCode::NOT_FOUND, "ERR_NOT_FOUND_WORKFLOW"),
                CoreError::StepNotFound { .. } => (StatusCode::NOT_FOUND, "ERR_NOT_FOUND_STEP"),
                CoreError::UnsupportedProfile { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "ERR_UNSUPPORTED_PROFILE")
                }
                CoreError::CatalogIntegrity(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "ERR_CATALOG_INTEGRITY")
                }
                CoreError::IllegalTransition { .. } => {
                    (StatusCode::CONFLICT, "ERR_ILLEGAL_TRANSITION")
                }
                CoreError::PrerequisiteNotMet { .. } => {
                    (StatusCode::CONFLICT, "ERR_PREREQUISITE_NOT_MET")
                }
                CoreError::ConcurrentModification(_) => {
                    (StatusCode::CONFLICT, "ERR_CONCURRENT_MODIFICATION")
                }
                CoreError::StateStoreError(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "ERR_STATE_STORE_ERROR")
                }
                CoreError::SerializationError(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "ERR_SERIALIZATION_ERROR")
                }
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = self.status_and_code();
        let message = match &self {
            ServerError::ValidationError(msg) => msg.clone(),
            other => other.to_string(),
        };

        if self.is_client_error() {
            warn!(error_code, %message, "Request rejected");
        } else {
            error!(error = ?self, error_code, "Request failed");
        }

        let mut body = json!({
            "error": message,
            "errorDetails": {
                "errorCode": error_code,
                "errorMessage": message,
            }
        });

        if let ServerError::Core(CoreError::PrerequisiteNotMet { missing, .. }) = &self {
            body["errorDetails"]["missingPrerequisites"] = json!(missing);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(err: ServerError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let (status, body) = render(ServerError::Core(CoreError::ClientNotFound("c-1".into()))).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Client not found: c-1");
        assert_eq!(body["errorDetails"]["errorCode"], "ERR_NOT_FOUND_CLIENT");
        assert_eq!(body["errorDetails"]["errorMessage"], "Client not found: c-1");
    }

    #[tokio::test]
    async fn test_prerequisite_details() {
        let (status, body) = render(ServerError::Core(CoreError::PrerequisiteNotMet {
            step_key: "b".into(),
            missing: vec!["a".into()],
        }))
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["errorDetails"]["missingPrerequisites"], json!(["a"]));
    }

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (ServerError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (CoreError::ValidationError("x".into()).into(), StatusCode::BAD_REQUEST),
            (
                ServerError::ConfigurationError("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ServerError::InternalError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                CoreError::StateStoreError("x".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CoreError::CatalogIntegrity("x".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CoreError::ConcurrentModification("x".into()).into(),
                StatusCode::CONFLICT,
            ),
            (
                CoreError::UnsupportedProfile {
                    client_type: "GST".into(),
                    business_size: "enterprise".into(),
                }
                .into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (CoreError::CatalogIntegrity("x".into()).into(), StatusCode::INTERNAL_SERVER_ERROR),
            (CoreError::ConcurrentModification("x".into()).into(), StatusCode::CONFLICT),
            (
                CoreError::IllegalTransition {
                    step_key: "a".into(),
                    from: "completed".into(),
                    to: "pending".into(),
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (
                CoreError::StepNotFound {
                    workflow_id: "w".into(),
                    step_key: "k".into(),
                }
                .into(),
                StatusCode::NOT_FOUND,
            ),
        ];

        for (err, expected) in cases {
            let (status, _) = err.status_and_code();
            assert_eq!(status, expected, "{}", err);
            assert_eq!(err.is_client_error(), status.is_client_error(), "{}", err);
        }
    }
}
