use thiserror::Error;

/// Core error type for the AuditFlow engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Input failed shape or enum validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Client not found
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// Workflow not found
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    /// Step key not present in the workflow
    #[error("Step {step_key} not found in workflow {workflow_id}")]
    StepNotFound {
        /// Workflow that was searched
        workflow_id: String,
        /// Requested step key
        step_key: String,
    },

    /// No template exists for the compliance profile
    #[error("No template for client type {client_type} and business size {business_size}")]
    UnsupportedProfile {
        /// Client type of the profile
        client_type: String,
        /// Business size of the profile
        business_size: String,
    },

    /// The catalog itself is inconsistent
    #[error("Catalog integrity error: {0}")]
    CatalogIntegrity(String),

    /// The state machine does not allow the transition
    #[error("Illegal transition for step {step_key}: {from} -> {to}")]
    IllegalTransition {
        /// Step being transitioned
        step_key: String,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// A prerequisite step is not completed
    #[error("Prerequisites not met for step {step_key}: {}", missing.join(", "))]
    PrerequisiteNotMet {
        /// Step being transitioned
        step_key: String,
        /// Prerequisite keys that are not completed
        missing: Vec<String>,
    },

    /// Optimistic concurrency check failed
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    /// State store error
    #[error("State store error: {0}")]
    StateStoreError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CoreError {
    /// Any of the not-found variants
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ClientNotFound(_)
                | CoreError::WorkflowNotFound(_)
                | CoreError::StepNotFound { .. }
        )
    }

    /// Rejections raised by the step state machine
    pub fn is_state_machine_rejection(&self) -> bool {
        matches!(
            self,
            CoreError::IllegalTransition { .. } | CoreError::PrerequisiteNotMet { .. }
        )
    }

    /// Whether the operation lost an optimistic concurrency race
    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::ConcurrentModification(_))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::CatalogIntegrity(format!("Invalid catalog document: {}", err))
    }
}
