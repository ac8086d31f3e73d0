//! Workflow aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::domain::catalog::Template;
use crate::domain::client::{BusinessSize, Client, ClientId, ClientType, FiscalYear};
use crate::domain::step::{
    derive_workflow_status, validate_transition, Step, StepStatus, Transition, WorkflowStatus,
};
use crate::CoreError;

/// Value object: Workflow ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(pub String);

impl WorkflowId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        WorkflowId(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a stored workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    /// The current workflow for its client and fiscal year
    Active,
    /// Replaced by a workflow generated from a newer template; read-only
    Superseded,
}

/// Aggregate: a client's checklist for one fiscal year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique identifier
    pub id: WorkflowId,

    /// Owning client
    pub client_id: ClientId,

    /// Client type at generation time
    pub client_type: ClientType,

    /// Business size at generation time
    pub business_size: BusinessSize,

    /// Fiscal year the workflow covers
    pub fiscal_year: FiscalYear,

    /// Version of the template the steps were materialized from
    pub template_version: u32,

    /// Active or superseded
    pub state: WorkflowState,

    /// Replacement workflow, once superseded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<WorkflowId>,

    /// Optimistic concurrency counter, bumped by every stored write
    pub revision: u64,

    /// Steps in template order
    pub steps: Vec<Step>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Materialize an active workflow with every step pending
    pub fn from_template(client: &Client, template: &Template) -> Self {
        let now = Utc::now();
        Self {
            id: WorkflowId::generate(),
            client_id: client.id.clone(),
            client_type: template.client_type,
            business_size: template.business_size,
            fiscal_year: client.fiscal_year.clone(),
            template_version: template.version,
            state: WorkflowState::Active,
            superseded_by: None,
            revision: 0,
            steps: template.steps.iter().map(Step::from_definition).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build the replacement of this workflow from a newer template
    ///
    /// Steps whose key exists in both versions keep their status; steps
    /// new to the template start pending. Steps dropped by the template are
    /// not carried.
    pub fn carry_forward(&self, template: &Template) -> Self {
        let previous: HashMap<&str, StepStatus> = self
            .steps
            .iter()
            .map(|s| (s.key.as_str(), s.status))
            .collect();

        let now = Utc::now();
        let steps = template
            .steps
            .iter()
            .map(|definition| {
                let mut step = Step::from_definition(definition);
                if let Some(status) = previous.get(definition.key.as_str()) {
                    step.status = *status;
                }
                step
            })
            .collect();

        Self {
            id: WorkflowId::generate(),
            client_id: self.client_id.clone(),
            client_type: template.client_type,
            business_size: template.business_size,
            fiscal_year: self.fiscal_year.clone(),
            template_version: template.version,
            state: WorkflowState::Active,
            superseded_by: None,
            revision: 0,
            steps,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the workflow is the current one for its client and year
    pub fn is_active(&self) -> bool {
        self.state == WorkflowState::Active
    }

    /// Look up a step by key
    pub fn step(&self, key: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.key == key)
    }

    /// Aggregate status derived from the steps
    pub fn status(&self) -> WorkflowStatus {
        derive_workflow_status(self.steps.iter().map(|s| s.status))
    }

    /// Move a step to a new status through the state machine
    ///
    /// Superseded workflows reject every change. Returns
    /// [`Transition::Unchanged`] without touching the workflow when the
    /// step already has the requested status.
    pub fn apply_step_status(
        &mut self,
        step_key: &str,
        to: StepStatus,
    ) -> Result<Transition, CoreError> {
        if !self.is_active() {
            let from = self
                .step(step_key)
                .map(|s| s.status.to_string())
                .ok_or_else(|| self.step_not_found(step_key))?;
            return Err(CoreError::IllegalTransition {
                step_key: step_key.to_string(),
                from,
                to: format!("{} (workflow {} is superseded)", to, self.id),
            });
        }

        let transition = validate_transition(&self.steps, step_key, to).map_err(|e| match e {
            CoreError::StepNotFound { step_key, .. } => self.step_not_found(&step_key),
            other => other,
        })?;

        if let Transition::Apply { to, .. } = transition {
            if let Some(step) = self.steps.iter_mut().find(|s| s.key == step_key) {
                step.status = to;
            }
            self.updated_at = Utc::now();
        }

        Ok(transition)
    }

    /// Retire the workflow in favour of `replacement`
    pub fn mark_superseded(&mut self, replacement: &WorkflowId) {
        self.state = WorkflowState::Superseded;
        self.superseded_by = Some(replacement.clone());
        self.updated_at = Utc::now();
    }

    fn step_not_found(&self, step_key: &str) -> CoreError {
        CoreError::StepNotFound {
            workflow_id: self.id.to_string(),
            step_key: step_key.to_string(),
        }
    }
}

/// Outward representation of a workflow, carrying its derived status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowView {
    /// The stored workflow
    #[serde(flatten)]
    pub workflow: Workflow,

    /// Aggregate status at the time the view was built
    pub status: WorkflowStatus,
}

impl From<Workflow> for WorkflowView {
    fn from(workflow: Workflow) -> Self {
        let status = workflow.status();
        Self { workflow, status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{StepCategory, TemplateCatalog};
    use crate::domain::client::RegisterClient;

    fn gst_small_client() -> Client {
        RegisterClient::new("Acme", "GST", "small", "FY 2024-25")
            .into_client()
            .unwrap()
    }

    fn gst_small_workflow() -> Workflow {
        let catalog = TemplateCatalog::builtin().unwrap();
        let template = catalog.resolve(ClientType::Gst, BusinessSize::Small).unwrap();
        Workflow::from_template(&gst_small_client(), template)
    }

    #[test]
    fn test_from_template() {
        let workflow = gst_small_workflow();

        assert!(workflow.is_active());
        assert_eq!(workflow.template_version, 1);
        assert_eq!(workflow.revision, 0);
        assert_eq!(workflow.fiscal_year.as_str(), "FY 2024-25");
        assert!(workflow.steps.iter().all(|s| s.status == StepStatus::Pending));
        assert_eq!(workflow.status(), WorkflowStatus::Pending);
        assert_eq!(
            workflow.step("gst-return-filing").unwrap().prerequisites,
            vec!["gst-registration".to_string()]
        );
    }

    #[test]
    fn test_carry_forward_keeps_shared_statuses() {
        let mut workflow = gst_small_workflow();
        workflow
            .apply_step_status("gst-registration", StepStatus::Completed)
            .unwrap();
        workflow
            .apply_step_status("gst-return-filing", StepStatus::InProgress)
            .unwrap();

        let v2 = Template::new(
            ClientType::Gst,
            BusinessSize::Small,
            2,
            vec![
                ("gst-registration".into(), "Register".into(), StepCategory::Registration, vec![]),
                ("gst-lut-filing".into(), "File LUT".into(), StepCategory::Filing, vec!["gst-registration".into()]),
                ("gst-return-filing".into(), "File returns".into(), StepCategory::Filing, vec!["gst-registration".into()]),
            ],
        );

        let next = workflow.carry_forward(&v2);

        assert_ne!(next.id, workflow.id);
        assert_eq!(next.template_version, 2);
        assert_eq!(next.client_id, workflow.client_id);
        let statuses: Vec<(&str, StepStatus)> =
            next.steps.iter().map(|s| (s.key.as_str(), s.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("gst-registration", StepStatus::Completed),
                ("gst-lut-filing", StepStatus::Pending),
                ("gst-return-filing", StepStatus::InProgress),
            ]
        );
        assert_eq!(next.steps[2].title, "File returns");
    }

    #[test]
    fn test_apply_step_status() {
        let mut workflow = gst_small_workflow();
        let before = workflow.updated_at;

        let transition = workflow
            .apply_step_status("gst-registration", StepStatus::InProgress)
            .unwrap();
        assert_eq!(
            transition,
            Transition::Apply {
                from: StepStatus::Pending,
                to: StepStatus::InProgress
            }
        );
        assert_eq!(workflow.status(), WorkflowStatus::InProgress);
        assert!(workflow.updated_at >= before);

        let unchanged = workflow
            .apply_step_status("gst-registration", StepStatus::InProgress)
            .unwrap();
        assert_eq!(unchanged, Transition::Unchanged);
    }

    #[test]
    fn test_unknown_step_names_workflow() {
        let mut workflow = gst_small_workflow();
        let err = workflow
            .apply_step_status("nope", StepStatus::Completed)
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::StepNotFound {
                workflow_id: workflow.id.to_string(),
                step_key: "nope".to_string(),
            }
        );
    }

    #[test]
    fn test_superseded_workflow_is_read_only() {
        let mut workflow = gst_small_workflow();
        workflow.mark_superseded(&WorkflowId("next".to_string()));

        let err = workflow
            .apply_step_status("gst-registration", StepStatus::Completed)
            .unwrap_err();
        assert!(matches!(err, CoreError::IllegalTransition { .. }));
        assert_eq!(workflow.superseded_by, Some(WorkflowId("next".to_string())));
        assert!(workflow.steps.iter().all(|s| s.status == StepStatus::Pending));
    }

    #[test]
    fn test_view_serializes_status_alongside_fields() {
        let mut workflow = gst_small_workflow();
        workflow
            .apply_step_status("gst-registration", StepStatus::Completed)
            .unwrap();

        let value = serde_json::to_value(WorkflowView::from(workflow.clone())).unwrap();
        assert_eq!(value["status"], "in_progress");
        assert_eq!(value["state"], "active");
        assert_eq!(value["id"], workflow.id.0.as_str());
        assert_eq!(value["steps"][0]["status"], "completed");
        assert!(value.get("superseded_by").is_none());
    }
}
