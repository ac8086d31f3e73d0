//! Client registry endpoints

use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use auditflow_core::{ClientId, RegisterClient};

use crate::error::ServerResult;
use crate::server::AuditFlowServer;

/// Paging parameters for the client list
#[derive(Debug, Default, Deserialize)]
pub struct ClientPage {
    /// Number of clients to skip
    #[serde(default)]
    pub offset: Option<usize>,
    /// Maximum number of clients to return
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Register a client
pub async fn create_client(
    State(server): State<Arc<AuditFlowServer>>,
    payload: Result<Json<RegisterClient>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(request) = payload?;
    let client = server.clients().create(request).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// List clients in creation order
pub async fn list_clients(
    State(server): State<Arc<AuditFlowServer>>,
    page: Result<Query<ClientPage>, QueryRejection>,
) -> ServerResult<impl IntoResponse> {
    let Query(page) = page?;
    let clients = server
        .clients()
        .list(page.offset.unwrap_or(0), page.limit)
        .await?;
    debug!(count = clients.len(), "Listed clients");
    Ok(Json(json!({ "items": clients })))
}

/// Get one client
pub async fn get_client(
    State(server): State<Arc<AuditFlowServer>>,
    Path(id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let client = server.clients().get(&ClientId(id)).await?;
    Ok(Json(client))
}
