//! Workflow generation
//!
//! Generation is idempotent per (client, fiscal year): asking again for the
//! same template version returns the stored workflow, and a newer catalog
//! version supersedes the stored workflow while carrying step statuses
//! forward.

use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    application::client_registry::ClientRegistry,
    domain::catalog::{Template, TemplateCatalog},
    domain::client::{Client, ClientId},
    domain::repository::WorkflowRepository,
    domain::workflow::Workflow,
    CoreError,
};

/// Service that materializes workflows from the template catalog
pub struct WorkflowGenerator {
    catalog: Arc<TemplateCatalog>,
    clients: ClientRegistry,
    workflow_repo: Arc<dyn WorkflowRepository>,
}

impl WorkflowGenerator {
    /// Create a new workflow generator
    pub fn new(
        catalog: Arc<TemplateCatalog>,
        clients: ClientRegistry,
        workflow_repo: Arc<dyn WorkflowRepository>,
    ) -> Self {
        Self {
            catalog,
            clients,
            workflow_repo,
        }
    }

    /// Generate, or return, the active workflow for a client
    ///
    /// A lost compare-and-swap race reruns the whole generation once.
    pub async fn generate(&self, client_id: &ClientId) -> Result<Workflow, CoreError> {
        let client = self.clients.get(client_id).await?;
        let template = self
            .catalog
            .resolve(client.client_type, client.business_size)?;

        match self.generate_once(&client, template).await {
            Err(err) if err.is_conflict() => {
                warn!(client_id = %client.id, error = %err, "Workflow generation conflict, retrying");
                match self.generate_once(&client, template).await {
                    Err(err) if err.is_conflict() => Err(CoreError::ConcurrentModification(format!(
                        "workflow generation for client {} conflicted twice",
                        client.id
                    ))),
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn generate_once(
        &self,
        client: &Client,
        template: &Template,
    ) -> Result<Workflow, CoreError> {
        let existing = self
            .workflow_repo
            .find_active(&client.id, &client.fiscal_year)
            .await?;

        match existing {
            None => {
                let workflow = Workflow::from_template(client, template);
                let stored = self.workflow_repo.insert(&workflow).await?;
                info!(
                    workflow_id = %stored.id,
                    client_id = %client.id,
                    template_version = stored.template_version,
                    steps = stored.steps.len(),
                    "Workflow generated"
                );
                Ok(stored)
            }
            Some(current) if current.template_version == template.version => Ok(current),
            Some(current) if current.template_version > template.version => {
                warn!(
                    workflow_id = %current.id,
                    client_id = %client.id,
                    stored_version = current.template_version,
                    catalog_version = template.version,
                    "Stored workflow is newer than the catalog template, leaving it unchanged"
                );
                Ok(current)
            }
            Some(current) => {
                let replacement = current.carry_forward(template);
                let stored = self.workflow_repo.supersede(&current, &replacement).await?;
                info!(
                    workflow_id = %stored.id,
                    superseded = %current.id,
                    client_id = %client.id,
                    from_version = current.template_version,
                    to_version = stored.template_version,
                    "Workflow regenerated from newer template"
                );
                Ok(stored)
            }
        }
    }
}
