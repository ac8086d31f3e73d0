//!
//! AuditFlow Core - Compliance workflow engine
//!
//! This crate defines the domain model, the versioned template catalog,
//! the step state machine, the repository interfaces and the application
//! services that generate and mutate compliance workflows.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - core business models, entities, and rules
pub mod domain;

/// Application services - core application logic
pub mod application;

/// Error types
pub mod error;

// Re-export key types
pub use error::CoreError;

pub use application::client_registry::ClientRegistry;
pub use application::workflow_generator::WorkflowGenerator;
pub use application::workflow_store::WorkflowStore;

pub use domain::catalog::{StepCategory, StepDefinition, Template, TemplateCatalog};
pub use domain::client::{BusinessSize, Client, ClientId, ClientType, FiscalYear, RegisterClient};
pub use domain::repository::{ClientRepository, WorkflowRepository};
pub use domain::step::{Step, StepStatus, Transition, WorkflowStatus};
pub use domain::workflow::{Workflow, WorkflowId, WorkflowState, WorkflowView};
