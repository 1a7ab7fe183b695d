//! The seam between the workflow engine and the automation backend.
//!
//! The executor and the web layer only see [`Automation`], so tests can swap
//! the HTTP client for in-process fakes.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};

use crate::types::AutomationResult;

/// Description sent by [`Automation::test_connection`].
pub fn connection_test_description() -> String {
    format!(
        "Connection test from Role Chat Interface - {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Something that can run an automation request.
#[async_trait]
pub trait Automation: Send + Sync {
    /// Trigger a run with a free-text description.
    ///
    /// Never fails: failures are reported through the returned result.
    async fn trigger(&self, description: &str, is_test: bool) -> AutomationResult;

    /// Lightweight reachability probe.
    async fn health_check(&self) -> AutomationResult;

    /// Send a marked test request.
    async fn test_connection(&self) -> AutomationResult {
        self.trigger(&connection_test_description(), true).await
    }

    /// Health probe followed by a test request.
    ///
    /// A health response of 500 or above short-circuits the test request.
    async fn check_connection(&self) -> AutomationResult {
        let health = self.health_check().await;
        tracing::debug!(
            success = health.success,
            status = ?health.status_code,
            "health probe finished"
        );

        if !health.success
            && let Some(status) = health.status_code
            && status >= 500
        {
            let reason = health.error.as_deref().unwrap_or("unreachable");
            return AutomationResult::failed(format!("Health check failed: {reason}"), true)
                .with_status(status);
        }

        self.test_connection().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
