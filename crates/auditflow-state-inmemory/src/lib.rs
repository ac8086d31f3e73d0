//! In-memory state store implementation for AuditFlow
//!
//! This crate provides in-memory implementations of the repository
//! interfaces defined in auditflow-core. It is useful for development,
//! testing, and single-process deployments where persistence across
//! restarts is not required.

use std::sync::Arc;
use tokio::sync::RwLock;

pub mod repositories;
pub use repositories::{
    ClientTable, InMemoryClientRepository, InMemoryWorkflowRepository, WorkflowTable,
};

use auditflow_core::domain::repository::{ClientRepository, WorkflowRepository};

/// Provider for in-memory state store repositories
pub struct InMemoryStateStoreProvider {
    // Shared storage for clients
    clients: Arc<RwLock<ClientTable>>,

    // Shared storage for workflow documents
    workflows: Arc<RwLock<WorkflowTable>>,
}

impl InMemoryStateStoreProvider {
    /// Create a new in-memory state store provider
    pub fn new() -> Self {
        Self {
            clients: Arc::new(RwLock::new(ClientTable::default())),
            workflows: Arc::new(RwLock::new(WorkflowTable::default())),
        }
    }

    /// Create repositories backed by this provider's storage
    ///
    /// Repositories created from the same provider share data.
    pub fn create_repositories(&self) -> (Arc<dyn ClientRepository>, Arc<dyn WorkflowRepository>) {
        let client_repo = Arc::new(InMemoryClientRepository::new(self.clients.clone()));
        let workflow_repo = Arc::new(InMemoryWorkflowRepository::new(self.workflows.clone()));

        (client_repo, workflow_repo)
    }
}

impl Default for InMemoryStateStoreProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
