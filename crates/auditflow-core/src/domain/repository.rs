//! Repository traits for the AuditFlow engine
//!
//! Storage backends implement these traits. Workflow writes are
//! compare-and-swap operations keyed on [`Workflow::revision`]; a stale
//! revision fails with [`CoreError::ConcurrentModification`] so the caller
//! can reload and retry.

use async_trait::async_trait;

use super::client::{Client, ClientId, FiscalYear};
use super::workflow::{Workflow, WorkflowId};
use crate::CoreError;

/// Repository for client profiles
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Persist a newly registered client
    async fn insert(&self, client: &Client) -> Result<(), CoreError>;

    /// Find a client by ID
    async fn find_by_id(&self, id: &ClientId) -> Result<Option<Client>, CoreError>;

    /// List clients in creation order, skipping `offset` and returning at most `limit`
    async fn list(&self, offset: usize, limit: Option<usize>) -> Result<Vec<Client>, CoreError>;
}

/// Repository for workflow aggregates
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Find a workflow by ID
    async fn find_by_id(&self, id: &WorkflowId) -> Result<Option<Workflow>, CoreError>;

    /// Find the active workflow for a client and fiscal year
    async fn find_active(
        &self,
        client_id: &ClientId,
        fiscal_year: &FiscalYear,
    ) -> Result<Option<Workflow>, CoreError>;

    /// All workflows of a client, active and superseded, in no particular order
    async fn list_by_client(&self, client_id: &ClientId) -> Result<Vec<Workflow>, CoreError>;

    /// Store a new workflow and return the stored copy
    ///
    /// Fails with `ConcurrentModification` if the id is taken, or if the
    /// workflow is active and another active workflow exists for the same
    /// client and fiscal year.
    async fn insert(&self, workflow: &Workflow) -> Result<Workflow, CoreError>;

    /// Replace a stored workflow if its stored revision equals `workflow.revision`
    ///
    /// The stored copy has its revision incremented and is returned.
    async fn update(&self, workflow: &Workflow) -> Result<Workflow, CoreError>;

    /// Atomically retire `current` and store `replacement` as the active workflow
    ///
    /// `current` must still be active at its expected revision.
    async fn supersede(
        &self,
        current: &Workflow,
        replacement: &Workflow,
    ) -> Result<Workflow, CoreError>;
}
