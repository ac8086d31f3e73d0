use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use auditflow_core::{
    CoreError,
    domain::client::{Client, ClientId, FiscalYear},
    domain::workflow::{Workflow, WorkflowId},
    domain::repository::{ClientRepository, WorkflowRepository},
};

/// Client storage: records plus their insertion order
#[derive(Default)]
pub struct ClientTable {
    records: HashMap<String, Client>,
    order: Vec<String>,
}

/// Workflow storage
///
/// Workflows are kept as JSON documents, the way a document database would
/// hold them, with an index of the active workflow per client and fiscal
/// year. Both live under one lock so compare-and-swap writes are atomic.
#[derive(Default)]
pub struct WorkflowTable {
    documents: HashMap<String, Value>,
    active: HashMap<(String, String), String>,
}

impl WorkflowTable {
    fn load(&self, id: &str) -> Result<Option<Workflow>, CoreError> {
        self.documents
            .get(id)
            .map(|doc| serde_json::from_value(doc.clone()).map_err(CoreError::from))
            .transpose()
    }

    fn store(&mut self, workflow: &Workflow) -> Result<(), CoreError> {
        let document = serde_json::to_value(workflow)?;
        self.documents.insert(workflow.id.0.clone(), document);
        Ok(())
    }

    fn stored_revision(&self, id: &str) -> Option<u64> {
        self.documents
            .get(id)
            .and_then(|doc| doc.get("revision"))
            .and_then(Value::as_u64)
    }
}

fn active_key(client_id: &ClientId, fiscal_year: &FiscalYear) -> (String, String) {
    (client_id.0.clone(), fiscal_year.as_str().to_string())
}

fn stale(id: &WorkflowId, expected: u64, found: Option<u64>) -> CoreError {
    match found {
        Some(found) => CoreError::ConcurrentModification(format!(
            "workflow {} is at revision {}, expected {}",
            id, found, expected
        )),
        None => CoreError::WorkflowNotFound(id.to_string()),
    }
}

/// In-memory implementation of the ClientRepository
pub struct InMemoryClientRepository {
    clients: Arc<RwLock<ClientTable>>,
}

impl InMemoryClientRepository {
    /// Create a new in-memory client repository
    pub fn new(clients: Arc<RwLock<ClientTable>>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl ClientRepository for InMemoryClientRepository {
    async fn insert(&self, client: &Client) -> Result<(), CoreError> {
        let mut table = self.clients.write().await;
        if table.records.contains_key(&client.id.0) {
            return Err(CoreError::StateStoreError(format!(
                "Client {} already exists",
                client.id
            )));
        }
        table.order.push(client.id.0.clone());
        table.records.insert(client.id.0.clone(), client.clone());
        debug!("Stored client {}", client.id);
        Ok(())
    }

    async fn find_by_id(&self, id: &ClientId) -> Result<Option<Client>, CoreError> {
        let table = self.clients.read().await;
        Ok(table.records.get(&id.0).cloned())
    }

    async fn list(&self, offset: usize, limit: Option<usize>) -> Result<Vec<Client>, CoreError> {
        let table = self.clients.read().await;
        let page = table
            .order
            .iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .filter_map(|id| table.records.get(id).cloned())
            .collect();
        Ok(page)
    }
}

/// In-memory implementation of the WorkflowRepository
pub struct InMemoryWorkflowRepository {
    workflows: Arc<RwLock<WorkflowTable>>,
}

impl InMemoryWorkflowRepository {
    /// Create a new in-memory workflow repository
    pub fn new(workflows: Arc<RwLock<WorkflowTable>>) -> Self {
        Self { workflows }
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn find_by_id(&self, id: &WorkflowId) -> Result<Option<Workflow>, CoreError> {
        let table = self.workflows.read().await;
        table.load(&id.0)
    }

    async fn find_active(
        &self,
        client_id: &ClientId,
        fiscal_year: &FiscalYear,
    ) -> Result<Option<Workflow>, CoreError> {
        let table = self.workflows.read().await;
        match table.active.get(&active_key(client_id, fiscal_year)) {
            Some(id) => table.load(id),
            None => Ok(None),
        }
    }

    async fn list_by_client(&self, client_id: &ClientId) -> Result<Vec<Workflow>, CoreError> {
        let table = self.workflows.read().await;
        table
            .documents
            .values()
            .filter(|doc| doc.get("client_id").and_then(Value::as_str) == Some(client_id.0.as_str()))
            .map(|doc| serde_json::from_value(doc.clone()).map_err(CoreError::from))
            .collect()
    }

    async fn insert(&self, workflow: &Workflow) -> Result<Workflow, CoreError> {
        let mut table = self.workflows.write().await;

        if table.documents.contains_key(&workflow.id.0) {
            return Err(CoreError::ConcurrentModification(format!(
                "workflow {} already exists",
                workflow.id
            )));
        }

        if workflow.is_active() {
            let key = active_key(&workflow.client_id, &workflow.fiscal_year);
            if let Some(existing) = table.active.get(&key) {
                return Err(CoreError::ConcurrentModification(format!(
                    "client {} already has active workflow {} for {}",
                    workflow.client_id, existing, workflow.fiscal_year
                )));
            }
            table.active.insert(key, workflow.id.0.clone());
        }

        table.store(workflow)?;
        debug!("Inserted workflow {} at revision {}", workflow.id, workflow.revision);
        Ok(workflow.clone())
    }

    async fn update(&self, workflow: &Workflow) -> Result<Workflow, CoreError> {
        let mut table = self.workflows.write().await;

        let found = table.stored_revision(&workflow.id.0);
        if found != Some(workflow.revision) {
            return Err(stale(&workflow.id, workflow.revision, found));
        }

        let mut stored = workflow.clone();
        stored.revision += 1;
        stored.updated_at = Utc::now();

        let key = active_key(&stored.client_id, &stored.fiscal_year);
        if !stored.is_active() && table.active.get(&key) == Some(&stored.id.0) {
            table.active.remove(&key);
        }

        table.store(&stored)?;
        debug!("Updated workflow {} to revision {}", stored.id, stored.revision);
        Ok(stored)
    }

    async fn supersede(
        &self,
        current: &Workflow,
        replacement: &Workflow,
    ) -> Result<Workflow, CoreError> {
        let mut table = self.workflows.write().await;

        let found = table.stored_revision(&current.id.0);
        if found != Some(current.revision) {
            return Err(stale(&current.id, current.revision, found));
        }

        let key = active_key(&current.client_id, &current.fiscal_year);
        if table.active.get(&key) != Some(&current.id.0) {
            return Err(CoreError::ConcurrentModification(format!(
                "workflow {} is no longer the active workflow",
                current.id
            )));
        }
        if table.documents.contains_key(&replacement.id.0) {
            return Err(CoreError::ConcurrentModification(format!(
                "workflow {} already exists",
                replacement.id
            )));
        }

        let mut retired = current.clone();
        retired.mark_superseded(&replacement.id);
        retired.revision += 1;

        let retired_doc = serde_json::to_value(&retired)?;
        let replacement_doc = serde_json::to_value(replacement)?;
        table.documents.insert(retired.id.0.clone(), retired_doc);
        table.documents.insert(replacement.id.0.clone(), replacement_doc);
        table.active.insert(key, replacement.id.0.clone());

        debug!("Workflow {} superseded by {}", current.id, replacement.id);
        Ok(replacement.clone())
    }
}
