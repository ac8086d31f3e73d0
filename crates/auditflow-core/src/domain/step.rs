//! Step instances and the step state machine
//!
//! ```text
//! pending ──► in_progress ──► completed
//!    │            │  ▲            ▲
//!    │            ▼  │            │
//!    │          blocked ──────────┤
//!    └────────────────────────────┘
//! ```
//!
//! Entering `in_progress` or `completed` additionally requires every
//! prerequisite step to be `completed`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::catalog::{StepCategory, StepDefinition};
use crate::CoreError;

/// Status of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not started (initial)
    Pending,
    /// Work has started
    InProgress,
    /// Work is waiting on something external
    Blocked,
    /// Done (terminal)
    Completed,
}

impl StepStatus {
    /// Wire spelling of the variant
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Blocked => "blocked",
            StepStatus::Completed => "completed",
        }
    }

    /// Whether no transition may leave this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed)
    }

    /// Whether the edge `self -> to` exists in the state machine
    pub fn can_transition_to(&self, to: StepStatus) -> bool {
        use StepStatus::*;
        matches!(
            (self, to),
            (Pending, InProgress)
                | (Pending, Completed)
                | (InProgress, Blocked)
                | (InProgress, Completed)
                | (Blocked, InProgress)
                | (Blocked, Completed)
        )
    }

    /// Entering this status requires completed prerequisites
    pub fn requires_prerequisites(&self) -> bool {
        matches!(self, StepStatus::InProgress | StepStatus::Completed)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StepStatus::Pending),
            "in_progress" => Ok(StepStatus::InProgress),
            "blocked" => Ok(StepStatus::Blocked),
            "completed" => Ok(StepStatus::Completed),
            other => Err(CoreError::ValidationError(format!(
                "Unknown step status '{}', expected one of pending, in_progress, blocked, completed",
                other
            ))),
        }
    }
}

/// A checklist item owned by exactly one workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Key of the originating step definition
    pub key: String,

    /// Human-readable title
    pub title: String,

    /// Category of work
    pub category: StepCategory,

    /// Current status; the only mutable field
    pub status: StepStatus,

    /// Position in the workflow (1-based)
    pub order: u32,

    /// Keys of steps that must be completed first
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl Step {
    /// Materialize a pending step from its definition
    pub fn from_definition(definition: &StepDefinition) -> Self {
        Self {
            key: definition.key.clone(),
            title: definition.title.clone(),
            category: definition.category,
            status: StepStatus::Pending,
            order: definition.order,
            prerequisites: definition.prerequisites.clone(),
        }
    }
}

/// Outcome of a validated transition request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The step already has the requested status
    Unchanged,
    /// The step moves between two statuses
    Apply {
        /// Status before the transition
        from: StepStatus,
        /// Status after the transition
        to: StepStatus,
    },
}

/// Check whether the step keyed `step_key` may move to `to`
///
/// `steps` is the full step list of the owning workflow, used to look up
/// prerequisite statuses.
pub fn validate_transition(
    steps: &[Step],
    step_key: &str,
    to: StepStatus,
) -> Result<Transition, CoreError> {
    let step = steps
        .iter()
        .find(|s| s.key == step_key)
        .ok_or_else(|| CoreError::StepNotFound {
            workflow_id: String::new(),
            step_key: step_key.to_string(),
        })?;

    let from = step.status;
    if from == to {
        return Ok(Transition::Unchanged);
    }

    if !from.can_transition_to(to) {
        return Err(CoreError::IllegalTransition {
            step_key: step.key.clone(),
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    if to.requires_prerequisites() {
        let statuses: HashMap<&str, StepStatus> =
            steps.iter().map(|s| (s.key.as_str(), s.status)).collect();

        let missing: Vec<String> = step
            .prerequisites
            .iter()
            .filter(|key| statuses.get(key.as_str()) != Some(&StepStatus::Completed))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(CoreError::PrerequisiteNotMet {
                step_key: step.key.clone(),
                missing,
            });
        }
    }

    Ok(Transition::Apply { from, to })
}

/// Aggregate status of a workflow, derived from its steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Nothing has started
    Pending,
    /// Some work has started
    InProgress,
    /// At least one step is blocked
    Blocked,
    /// Every step is completed
    Completed,
}

/// Derive the workflow status from step statuses
///
/// An empty step list is `pending`.
pub fn derive_workflow_status<I>(statuses: I) -> WorkflowStatus
where
    I: IntoIterator<Item = StepStatus>,
{
    let mut any = false;
    let mut all_completed = true;
    let mut any_blocked = false;
    let mut any_started = false;

    for status in statuses {
        any = true;
        all_completed &= status == StepStatus::Completed;
        any_blocked |= status == StepStatus::Blocked;
        any_started |= status != StepStatus::Pending;
    }

    if any && all_completed {
        WorkflowStatus::Completed
    } else if any_blocked {
        WorkflowStatus::Blocked
    } else if any_started {
        WorkflowStatus::InProgress
    } else {
        WorkflowStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StepStatus::*;

    fn step(key: &str, status: StepStatus, prerequisites: &[&str]) -> Step {
        Step {
            key: key.to_string(),
            title: key.to_uppercase(),
            category: StepCategory::Other,
            status,
            order: 0,
            prerequisites: prerequisites.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_transition_table() {
        let all = [Pending, InProgress, Blocked, Completed];
        let legal = [
            (Pending, InProgress),
            (Pending, Completed),
            (InProgress, Blocked),
            (InProgress, Completed),
            (Blocked, InProgress),
            (Blocked, Completed),
        ];

        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
        assert!(Completed.is_terminal());
    }

    #[test]
    fn test_prerequisite_enforcement() {
        let steps = vec![step("a", InProgress, &[]), step("b", Pending, &["a"])];

        for target in [InProgress, Completed] {
            let err = validate_transition(&steps, "b", target).unwrap_err();
            assert_eq!(
                err,
                CoreError::PrerequisiteNotMet {
                    step_key: "b".to_string(),
                    missing: vec!["a".to_string()],
                }
            );
        }

        let steps = vec![step("a", Completed, &[]), step("b", Pending, &["a"])];
        assert_eq!(
            validate_transition(&steps, "b", InProgress).unwrap(),
            Transition::Apply { from: Pending, to: InProgress }
        );
    }

    #[test]
    fn test_blocked_step_resumes_only_with_prerequisites() {
        let steps = vec![step("a", Blocked, &[]), step("b", Blocked, &["a"])];
        assert!(matches!(
            validate_transition(&steps, "b", InProgress),
            Err(CoreError::PrerequisiteNotMet { .. })
        ));
        assert!(validate_transition(&steps, "a", InProgress).is_ok());
    }

    #[test]
    fn test_blocked_step_completes_only_with_prerequisites() {
        let steps = vec![step("a", InProgress, &[]), step("b", Blocked, &["a"])];
        assert_eq!(
            validate_transition(&steps, "b", Completed).unwrap_err(),
            CoreError::PrerequisiteNotMet {
                step_key: "b".to_string(),
                missing: vec!["a".to_string()],
            }
        );

        let steps = vec![step("a", Completed, &[]), step("b", Blocked, &["a"])];
        assert_eq!(
            validate_transition(&steps, "b", Completed).unwrap(),
            Transition::Apply { from: Blocked, to: Completed }
        );
    }

    #[test]
    fn test_illegal_transition_checked_before_prerequisites() {
        let steps = vec![step("a", Pending, &[]), step("b", Completed, &["a"])];
        assert_eq!(
            validate_transition(&steps, "b", InProgress).unwrap_err(),
            CoreError::IllegalTransition {
                step_key: "b".to_string(),
                from: "completed".to_string(),
                to: "in_progress".to_string(),
            }
        );
        assert!(matches!(
            validate_transition(&steps, "a", Blocked),
            Err(CoreError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_same_status_is_unchanged() {
        let steps = vec![step("a", Completed, &[])];
        assert_eq!(
            validate_transition(&steps, "a", Completed).unwrap(),
            Transition::Unchanged
        );
    }

    #[test]
    fn test_unknown_step() {
        let steps = vec![step("a", Pending, &[])];
        assert!(validate_transition(&steps, "zzz", Completed)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_derived_status() {
        assert_eq!(derive_workflow_status([Completed, Completed, Blocked]), WorkflowStatus::Blocked);
        assert_eq!(derive_workflow_status([Completed, Completed]), WorkflowStatus::Completed);
        assert_eq!(derive_workflow_status([Pending, Pending]), WorkflowStatus::Pending);
        assert_eq!(derive_workflow_status([Pending, Completed]), WorkflowStatus::InProgress);
        assert_eq!(derive_workflow_status([InProgress, Blocked]), WorkflowStatus::Blocked);
        assert_eq!(derive_workflow_status(Vec::new()), WorkflowStatus::Pending);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_string(&InProgress).unwrap(), "\"in_progress\"");
        assert_eq!("blocked".parse::<StepStatus>().unwrap(), Blocked);
        assert!("done".parse::<StepStatus>().is_err());
    }
}
