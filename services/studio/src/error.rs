//! services/studio/src/error.rs
//!
//! Defines the primary error type for the entire `studio` service.

use crate::config::ConfigError;
use lesson_studio_core::ports::PortError;
use lesson_studio_core::workflow::WorkflowError;

/// The primary error type for the `studio` service.
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service
    /// ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the core generation workflow.
    #[error("Workflow Error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Represents a standard Input/Output error (e.g., reading the local
    /// state file or stdin).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
