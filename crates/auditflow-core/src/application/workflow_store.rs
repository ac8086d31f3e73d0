use std::cmp::Reverse;
use std::sync::Arc;

use crate::{
    domain::client::ClientId,
    domain::repository::WorkflowRepository,
    domain::step::{StepStatus, Transition},
    domain::workflow::{Workflow, WorkflowId},
    CoreError,
};

/// Service for reading workflows and mutating step status
#[derive(Clone)]
pub struct WorkflowStore {
    workflow_repo: Arc<dyn WorkflowRepository>,
}

impl WorkflowStore {
    /// Create a new workflow store
    pub fn new(workflow_repo: Arc<dyn WorkflowRepository>) -> Self {
        Self { workflow_repo }
    }

    /// Persist a workflow
    ///
    /// Unknown ids are inserted; known ids are updated against the revision
    /// the caller holds.
    pub async fn save(&self, workflow: &Workflow) -> Result<Workflow, CoreError> {
        match self.workflow_repo.find_by_id(&workflow.id).await? {
            Some(_) => self.workflow_repo.update(workflow).await,
            None => self.workflow_repo.insert(workflow).await,
        }
    }

    /// Get a workflow by ID
    pub async fn get_by_id(&self, id: &WorkflowId) -> Result<Workflow, CoreError> {
        self.workflow_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::WorkflowNotFound(id.to_string()))
    }

    /// Workflows of a client: active first, then superseded, newest first
    pub async fn list_by_client(
        &self,
        client_id: &ClientId,
        include_superseded: bool,
    ) -> Result<Vec<Workflow>, CoreError> {
        let mut workflows = self.workflow_repo.list_by_client(client_id).await?;
        if !include_superseded {
            workflows.retain(Workflow::is_active);
        }
        workflows.sort_by_key(|w| (!w.is_active(), Reverse(w.created_at)));
        Ok(workflows)
    }

    /// Move one step of a workflow to a new status
    ///
    /// The write is a compare-and-swap on the workflow revision. A lost
    /// race reloads and revalidates once; a second loss is reported as
    /// `ConcurrentModification`.
    pub async fn update_step_status(
        &self,
        workflow_id: &WorkflowId,
        step_key: &str,
        status: StepStatus,
    ) -> Result<Workflow, CoreError> {
        match self.update_once(workflow_id, step_key, status).await {
            Err(err) if err.is_conflict() => {
                tracing::debug!(workflow_id = %workflow_id, step_key, "Step update conflict, retrying");
                match self.update_once(workflow_id, step_key, status).await {
                    Err(err) if err.is_conflict() => Err(CoreError::ConcurrentModification(format!(
                        "workflow {} was modified concurrently while updating step {}",
                        workflow_id, step_key
                    ))),
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn update_once(
        &self,
        workflow_id: &WorkflowId,
        step_key: &str,
        status: StepStatus,
    ) -> Result<Workflow, CoreError> {
        let mut workflow = self.get_by_id(workflow_id).await?;

        match workflow.apply_step_status(step_key, status)? {
            Transition::Unchanged => Ok(workflow),
            Transition::Apply { from, to } => {
                let stored = self.workflow_repo.update(&workflow).await?;
                tracing::info!(
                    workflow_id = %workflow_id,
                    step_key,
                    from = %from,
                    to = %to,
                    revision = stored.revision,
                    "Step status updated"
                );
                Ok(stored)
            }
        }
    }
}
