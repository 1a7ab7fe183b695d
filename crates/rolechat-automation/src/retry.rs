//! Retry policy for automation calls.
//!
//! A policy bounds the number of attempts and decides how long to wait
//! between them.  Server-provided `Retry-After` values take precedence over
//! the linear backoff but are capped.

use std::time::Duration;

/// Seconds assumed when a 429 response has no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Bounded, linear-backoff retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay unit; attempt `n` waits `n * base_delay` before the next try.
    pub base_delay: Duration,
    /// Upper bound on waits derived from `Retry-After`.
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_secs(2),
            max_retry_after: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn single_attempt(self) -> Self {
        Self {
            max_attempts: 1,
            ..self
        }
    }

    /// Whether another attempt is allowed after `attempt` (1-based).
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Wait before the attempt following `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.max(1))
    }

    /// Wait requested by a rate-limited response, capped.
    pub fn rate_limit_wait(&self, retry_after_secs: u64) -> Duration {
        Duration::from_secs(retry_after_secs).min(self.max_retry_after)
    }
}

/// Parse a `Retry-After` header value given in seconds.
pub fn parse_retry_after(header: Option<&str>) -> u64 {
    header
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}
