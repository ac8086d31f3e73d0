/// Client registration and lookup
pub mod client_registry;

/// Workflow generation from the template catalog
pub mod workflow_generator;

/// Workflow reads and step status mutation
pub mod workflow_store;
