//! Automation client error types.
//!
//! [`AutomationError`] only lives inside the client: every public trigger
//! operation folds it into an [`AutomationResult`](crate::AutomationResult)
//! before returning.

/// Unified error type for the automation client.
#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    // -- Configuration errors ------------------------------------------------
    /// The configured endpoint is not a valid URL.
    #[error("invalid automation endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    // -- Transport errors ----------------------------------------------------
    /// An attempt exceeded its time budget.
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The request could not be sent or the response body could not be read.
    #[error("network error: {reason}")]
    Transport { reason: String },

    // -- Serialization -------------------------------------------------------
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AutomationError {
    /// Map a `reqwest` failure onto the transport variants.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                seconds: timeout_secs,
            }
        } else {
            Self::Transport {
                reason: err.to_string(),
            }
        }
    }
}

/// Convenience alias used throughout the automation crate.
pub type Result<T> = std::result::Result<T, AutomationError>;
