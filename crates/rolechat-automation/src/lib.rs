//! Client for the external automation trigger endpoint.
//!
//! This crate provides:
//!
//! - **Client**: [`client::AutomationClient`], a JSON-over-HTTP trigger with
//!   per-attempt timeouts, bounded retries, and rate-limit handling.
//! - **Classification**: backend error codes mapped onto temporary,
//!   permanent, or still-processing outcomes via [`classify`].
//! - **Reports**: readable summaries of the tasks a run performed via
//!   [`summary`].
//! - **Seam**: the [`Automation`] trait the workflow executor dispatches
//!   through.

pub mod classify;
pub mod client;
pub mod error;
pub mod retry;
pub mod summary;
pub mod traits;
pub mod types;

pub use classify::{BackendErrorCode, ErrorClassification};
pub use client::{AttemptOutcome, AutomationClient, AutomationConfig};
pub use error::{AutomationError, Result};
pub use retry::RetryPolicy;
pub use traits::Automation;
pub use types::{AutomationResult, AutomationTask, TriggerRequest};
