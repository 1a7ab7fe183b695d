//! Workflow engine error types.
//!
//! Planning, execution and reconciliation are infallible from the caller's
//! point of view; these errors surface only from construction and
//! validation helpers.

/// Unified error type for the workflow engine.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    // -- Analyzer errors -----------------------------------------------------
    /// A built-in keyword set or pattern failed to compile.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // -- Plan errors ---------------------------------------------------------
    /// The dependency graph contains a cycle through the named step.
    #[error("cyclic dependency detected at step {step_id}")]
    CyclicDependency { step_id: String },

    /// A status update could not be interpreted.
    #[error("invalid workflow update: {reason}")]
    InvalidUpdate { reason: String },

    // -- Serialization -------------------------------------------------------
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the workflow crate.
pub type Result<T> = std::result::Result<T, WorkflowError>;
