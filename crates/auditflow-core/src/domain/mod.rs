/// Client profiles
pub mod client;

/// Versioned template catalog
pub mod catalog;

/// Step instances and the step state machine
pub mod step;

/// Workflow aggregate
pub mod workflow;

/// Repository interfaces
pub mod repository;
