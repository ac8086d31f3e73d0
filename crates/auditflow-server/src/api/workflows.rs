//! Workflow endpoints

use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use auditflow_core::{ClientId, StepStatus, WorkflowId, WorkflowView};

use crate::error::{ServerError, ServerResult};
use crate::server::AuditFlowServer;

/// Body of a generation request
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Client to generate for
    pub client_id: String,
}

/// Filters for the workflow list
#[derive(Debug, Default, Deserialize)]
pub struct WorkflowFilter {
    /// Owning client; required
    #[serde(default)]
    pub client_id: Option<String>,
    /// Include superseded workflows
    #[serde(default)]
    pub include_superseded: Option<bool>,
}

/// Body of a step status change
#[derive(Debug, Deserialize)]
pub struct UpdateStepRequest {
    /// Target status
    pub status: String,
}

/// Generate, or return, the active workflow for a client
pub async fn generate_workflow(
    State(server): State<Arc<AuditFlowServer>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(request) = payload?;
    if request.client_id.trim().is_empty() {
        return Err(ServerError::ValidationError(
            "client_id must not be empty".to_string(),
        ));
    }

    let workflow = server
        .generator()
        .generate(&ClientId(request.client_id))
        .await?;
    Ok(Json(WorkflowView::from(workflow)))
}

/// List the workflows of a client
pub async fn list_workflows(
    State(server): State<Arc<AuditFlowServer>>,
    filter: Result<Query<WorkflowFilter>, QueryRejection>,
) -> ServerResult<impl IntoResponse> {
    let Query(filter) = filter?;
    let client_id = filter
        .client_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| {
            ServerError::ValidationError("client_id query parameter is required".to_string())
        })?;

    let workflows = server
        .workflows()
        .list_by_client(&ClientId(client_id), filter.include_superseded.unwrap_or(false))
        .await?;

    let items: Vec<WorkflowView> = workflows.into_iter().map(WorkflowView::from).collect();
    Ok(Json(json!({ "items": items })))
}

/// Get one workflow
pub async fn get_workflow(
    State(server): State<Arc<AuditFlowServer>>,
    Path(id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let workflow = server.workflows().get_by_id(&WorkflowId(id)).await?;
    Ok(Json(WorkflowView::from(workflow)))
}

/// Change the status of one step
pub async fn update_step_status(
    State(server): State<Arc<AuditFlowServer>>,
    Path((id, key)): Path<(String, String)>,
    payload: Result<Json<UpdateStepRequest>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(request) = payload?;
    let status: StepStatus = request.status.parse()?;

    info!(workflow_id = %id, step_key = %key, status = %status, "Step status change requested");
    let workflow = server
        .workflows()
        .update_step_status(&WorkflowId(id), &key, status)
        .await?;
    Ok(Json(WorkflowView::from(workflow)))
}
