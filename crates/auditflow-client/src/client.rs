//! HTTP client for the AuditFlow API

use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use auditflow_core::{
    Client as ComplianceClient, ClientId, RegisterClient, StepStatus, WorkflowId, WorkflowView,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Client for a remote AuditFlow service
#[derive(Debug, Clone)]
pub struct AuditFlowClient {
    config: ClientConfig,
    client: Client,
}

/// Service health as reported by `/health`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    /// `UP` when the service is serving
    pub status: String,
    /// Service version
    pub version: String,
}

/// List response wrapper
#[derive(Debug, Deserialize)]
struct Items<T> {
    items: Vec<T>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    client_id: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateStepRequest<'a> {
    status: &'a str,
}

/// Error body returned by the service
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "errorDetails")]
    error_details: Option<ErrorDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetails {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    missing_prerequisites: Vec<String>,
}

/// A prepared request, rebuilt for every attempt
struct Call<'a> {
    method: Method,
    path: String,
    query: Vec<(&'a str, String)>,
    body: Option<serde_json::Value>,
    idempotent: bool,
}

impl<'a> Call<'a> {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            idempotent: true,
        }
    }

    /// Repeating the call may repeat its effect
    fn not_idempotent(mut self) -> Self {
        self.idempotent = false;
        self
    }

    fn query(mut self, key: &'a str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    fn json<B: Serialize>(mut self, body: &B) -> ClientResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ClientError::Decode(format!("Failed to encode request: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }
}

impl AuditFlowClient {
    /// Creates a new AuditFlowClient with the provided configuration
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                ClientError::ConfigurationError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Creates a new AuditFlowClient for the given base URL with default settings
    pub fn with_base_url(base_url: impl Into<String>) -> ClientResult<Self> {
        Self::new(ClientConfig::with_base_url(base_url))
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Register a new client
    ///
    /// Registration is not idempotent: it is retried only when the request
    /// never reached the service.
    #[instrument(skip(self, request), fields(client_type = %request.client_type))]
    pub async fn create_client(&self, request: &RegisterClient) -> ClientResult<ComplianceClient> {
        let call = Call::new(Method::POST, "/clients")
            .json(request)?
            .not_idempotent();
        self.execute(call).await
    }

    /// List registered clients in registration order
    #[instrument(skip(self))]
    pub async fn list_clients(
        &self,
        offset: usize,
        limit: Option<usize>,
    ) -> ClientResult<Vec<ComplianceClient>> {
        let mut call = Call::new(Method::GET, "/clients").query("offset", offset);
        if let Some(limit) = limit {
            call = call.query("limit", limit);
        }

        let page: Items<ComplianceClient> = self.execute(call).await?;
        Ok(page.items)
    }

    /// Fetch one client
    #[instrument(skip(self), fields(client_id = %id))]
    pub async fn get_client(&self, id: &ClientId) -> ClientResult<ComplianceClient> {
        self.execute(Call::new(Method::GET, format!("/clients/{}", id.0)))
            .await
    }

    /// Generate, or return, the active workflow for a client
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn generate_workflow(&self, client_id: &ClientId) -> ClientResult<WorkflowView> {
        let body = GenerateRequest {
            client_id: &client_id.0,
        };
        self.execute(Call::new(Method::POST, "/workflows/generate").json(&body)?)
            .await
    }

    /// List a client's workflows, active first
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn list_workflows(
        &self,
        client_id: &ClientId,
        include_superseded: bool,
    ) -> ClientResult<Vec<WorkflowView>> {
        let call = Call::new(Method::GET, "/workflows")
            .query("client_id", &client_id.0)
            .query("include_superseded", include_superseded);

        let page: Items<WorkflowView> = self.execute(call).await?;
        Ok(page.items)
    }

    /// Fetch one workflow
    #[instrument(skip(self), fields(workflow_id = %id))]
    pub async fn get_workflow(&self, id: &WorkflowId) -> ClientResult<WorkflowView> {
        self.execute(Call::new(Method::GET, format!("/workflows/{}", id.0)))
            .await
    }

    /// Move one step to a new status
    #[instrument(skip(self), fields(workflow_id = %id, step_key = %step_key, status = %status))]
    pub async fn update_step_status(
        &self,
        id: &WorkflowId,
        step_key: &str,
        status: StepStatus,
    ) -> ClientResult<WorkflowView> {
        let body = UpdateStepRequest {
            status: status.as_str(),
        };
        let path = format!("/workflows/{}/steps/{}", id.0, step_key);
        self.execute(Call::new(Method::PATCH, path).json(&body)?)
            .await
    }

    /// Service health
    #[instrument(skip(self))]
    pub async fn health(&self) -> ClientResult<HealthStatus> {
        self.execute(Call::new(Method::GET, "/health")).await
    }

    /// Run a call, retrying transient failures with exponential backoff
    async fn execute<T: DeserializeOwned>(&self, call: Call<'_>) -> ClientResult<T> {
        let policy = &self.config.retry;
        let mut attempt = 0;

        loop {
            match self.send_once(&call).await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(&call, &err) && attempt < policy.max_retries => {
                    attempt += 1;
                    let delay = policy.delay_for(attempt);
                    warn!(
                        method = %call.method,
                        path = %call.path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn should_retry(&self, call: &Call<'_>, err: &ClientError) -> bool {
        if call.idempotent {
            err.is_retryable()
        } else {
            err.is_undelivered()
        }
    }

    async fn send_once<T: DeserializeOwned>(&self, call: &Call<'_>) -> ClientResult<T> {
        let url = format!("{}{}", self.config.base_url, call.path);
        debug!("{} {}", call.method, url);

        let mut request = self.client.request(call.method.clone(), &url);
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ClientError::Decode(format!("Failed to parse response: {}", e)));
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|_| format!("HTTP error: {}", status));
        Err(api_error(status, &text))
    }
}

fn api_error(status: StatusCode, text: &str) -> ClientError {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();
    let details = body.error_details.unwrap_or_default();

    let message = details
        .error_message
        .or(body.error)
        .unwrap_or_else(|| {
            if text.is_empty() {
                status.to_string()
            } else {
                text.to_string()
            }
        });

    ClientError::Api {
        status: status.as_u16(),
        code: details
            .error_code
            .unwrap_or_else(|| format!("ERR_HTTP_{}", status.as_u16())),
        message,
        missing_prerequisites: details.missing_prerequisites,
    }
}
