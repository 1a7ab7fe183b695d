//! HTTP client for the automation trigger endpoint.
//!
//! Every trigger is a JSON `POST` with a per-attempt timeout.  Responses are
//! interpreted into an [`AutomationResult`]; transport failures, 429s and
//! temporary 5xx responses are retried according to a [`RetryPolicy`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, Utc};
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::classify::classify_response;
use crate::error::{AutomationError, Result};
use crate::retry::{RetryPolicy, parse_retry_after};
use crate::summary::{GENERIC_SUCCESS_SUMMARY, processing_summary, summarize_tasks};
use crate::traits::Automation;
use crate::types::{AutomationResult, AutomationTask, TriggerRequest};

/// `User-Agent` sent on every request.
pub const CLIENT_USER_AGENT: &str = "Role-Chat-Interface/1.0";

/// Number of characters of the endpoint shown in logs (it embeds a signature).
const LOGGED_URL_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for [`AutomationClient`].
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    /// Full trigger URL, including its signed query string.
    pub endpoint: String,
    /// Time budget for a single trigger attempt.
    pub timeout: Duration,
    /// Time budget for the health probe.
    pub health_timeout: Duration,
    /// Retry policy for normal triggers; test calls use a single attempt.
    pub retry: RetryPolicy,
    /// Descriptions longer than this many characters are truncated.
    pub max_description_chars: usize,
}

impl AutomationConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(15),
            health_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            max_description_chars: 1500,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

// ---------------------------------------------------------------------------
// Response interpretation
// ---------------------------------------------------------------------------

/// What the retry loop should do with one HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// Final answer, do not retry.
    Finished(AutomationResult),
    /// 429: retry after the given number of seconds if attempts remain.
    RateLimited {
        result: AutomationResult,
        retry_after_secs: u64,
    },
    /// Temporary failure: retry with backoff if attempts remain.
    Temporary(AutomationResult),
}

/// Interpret a single HTTP response.
///
/// `description` is the caller's original text, echoed in the processing
/// summary when the backend answers `NoResponse`.
pub fn interpret_response(
    status: u16,
    retry_after: Option<&str>,
    body: &str,
    is_test: bool,
    description: &str,
) -> AttemptOutcome {
    if (200..300).contains(&status) {
        return AttemptOutcome::Finished(success_result(status, body, is_test));
    }

    let classification = classify_response(status, body);

    if classification.is_processing {
        info!(status, "backend accepted the run without an immediate response");
        let mut result = AutomationResult::succeeded(
            "Automation workflow triggered successfully (processing in background)",
        )
        .with_status(status)
        .with_tracking_id(classification.tracking_id)
        .with_flow_summary(processing_summary(description, Local::now()));
        result.is_temporary = Some(false);
        result.is_processing = Some(true);
        return AttemptOutcome::Finished(result);
    }

    if status == 429 {
        let retry_after_secs = parse_retry_after(retry_after);
        let mut result = AutomationResult::failed("Rate limited by automation backend", true)
            .with_status(status);
        result.retry_after = Some(retry_after_secs);
        return AttemptOutcome::RateLimited {
            result,
            retry_after_secs,
        };
    }

    let is_server_error = status >= 500;
    let is_temporary = is_server_error && classification.is_temporary;
    let mut result = AutomationResult::failed(classification.message, is_temporary)
        .with_status(status)
        .with_tracking_id(classification.tracking_id);
    result.is_processing = Some(false);

    if is_temporary {
        AttemptOutcome::Temporary(result)
    } else {
        AttemptOutcome::Finished(result)
    }
}

fn success_result(status: u16, body: &str, is_test: bool) -> AutomationResult {
    let message = if is_test {
        "Test connection successful"
    } else {
        "Automation workflow triggered successfully"
    };

    let (tasks, summary) = match parse_tasks(body) {
        Some(tasks) => {
            let summary = summarize_tasks(&tasks);
            (tasks, summary)
        }
        None => (Vec::new(), GENERIC_SUCCESS_SUMMARY.to_owned()),
    };

    let mut result = AutomationResult::succeeded(message)
        .with_status(status)
        .with_flow_summary(summary);
    result.tasks = Some(tasks);
    result
}

/// Extract a task list from a success body: either a bare array or an object
/// with a `tasks` array.
pub fn parse_tasks(body: &str) -> Option<Vec<AutomationTask>> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "success body is not JSON, using generic summary");
            return None;
        }
    };
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("tasks") {
            Some(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };
    Some(
        items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
    )
}

/// Truncate to `max_chars` characters, appending `...` when cut.
pub fn truncate_description(description: &str, max_chars: usize) -> String {
    match description.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &description[..cut]),
        None => description.to_owned(),
    }
}

/// The endpoint without its query string or fragment.
pub fn health_url(endpoint: &str) -> Result<url::Url> {
    let mut url = url::Url::parse(endpoint).map_err(|e| AutomationError::InvalidEndpoint {
        endpoint: redact(endpoint),
        reason: e.to_string(),
    })?;
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn redact(endpoint: &str) -> String {
    let shown: String = endpoint.chars().take(LOGGED_URL_CHARS).collect();
    if shown.len() < endpoint.len() {
        format!("{shown}...")
    } else {
        shown
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Resilient client for the automation trigger endpoint.
#[derive(Debug, Clone)]
pub struct AutomationClient {
    config: AutomationConfig,
    endpoint: url::Url,
    health_endpoint: url::Url,
    http: reqwest::Client,
}

impl AutomationClient {
    /// Create a client, validating the endpoint URL.
    pub fn new(config: AutomationConfig) -> Result<Self> {
        let endpoint =
            url::Url::parse(&config.endpoint).map_err(|e| AutomationError::InvalidEndpoint {
                endpoint: redact(&config.endpoint),
                reason: e.to_string(),
            })?;
        let health_endpoint = health_url(&config.endpoint)?;

        let http = reqwest::Client::builder()
            .user_agent(CLIENT_USER_AGENT)
            .build()
            .map_err(|e| AutomationError::ClientBuild(e.to_string()))?;

        Ok(Self {
            config,
            endpoint,
            health_endpoint,
            http,
        })
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    /// Host of the endpoint, for security-policy allowlists.
    pub fn endpoint_origin(&self) -> String {
        self.endpoint.origin().ascii_serialization()
    }

    /// Send one attempt and interpret the response.
    async fn send_once(
        &self,
        description: &str,
        original: &str,
        is_test: bool,
    ) -> Result<AttemptOutcome> {
        let request = TriggerRequest::new(description, is_test, Utc::now());
        let timeout_secs = self.config.timeout.as_secs();

        let response = self
            .http
            .post(self.endpoint.clone())
            .timeout(self.config.timeout)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(CACHE_CONTROL, "no-cache")
            .json(&request)
            .send()
            .await
            .map_err(|e| AutomationError::from_reqwest(e, timeout_secs))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if (200..300).contains(&status) => {
                warn!(status, error = %e, "success response body unreadable");
                return Ok(AttemptOutcome::Finished(success_result(status, "", is_test)));
            }
            Err(e) => return Err(AutomationError::from_reqwest(e, timeout_secs)),
        };

        debug!(status, body_length = body.len(), "automation response received");

        Ok(interpret_response(
            status,
            retry_after.as_deref(),
            &body,
            is_test,
            original,
        ))
    }
}

#[async_trait]
impl Automation for AutomationClient {
    async fn trigger(&self, description: &str, is_test: bool) -> AutomationResult {
        if description.trim().is_empty() {
            return AutomationResult::failed("Description is required", false);
        }

        let payload = truncate_description(description, self.config.max_description_chars);
        let policy = if is_test {
            self.config.retry.single_attempt()
        } else {
            self.config.retry
        };

        let mut last_error: Option<String> = None;
        let mut last_status: Option<u16> = None;
        let mut last_tracking_id: Option<String> = None;

        for attempt in 1..=policy.max_attempts {
            info!(
                attempt,
                max_attempts = policy.max_attempts,
                is_test,
                url = %redact(self.endpoint.as_str()),
                "triggering automation"
            );

            match self.send_once(&payload, description, is_test).await {
                Ok(AttemptOutcome::Finished(result)) => return result,
                Ok(AttemptOutcome::RateLimited {
                    result,
                    retry_after_secs,
                }) => {
                    warn!(attempt, retry_after_secs, "rate limited by automation backend");
                    if !policy.can_retry(attempt) {
                        return result;
                    }
                    last_status = result.status_code;
                    tokio::time::sleep(policy.rate_limit_wait(retry_after_secs)).await;
                }
                Ok(AttemptOutcome::Temporary(result)) => {
                    warn!(
                        attempt,
                        status = ?result.status_code,
                        error = ?result.error,
                        "temporary automation failure"
                    );
                    if !policy.can_retry(attempt) {
                        return result;
                    }
                    last_status = result.status_code;
                    last_tracking_id = result.tracking_id.clone();
                    tokio::time::sleep(policy.backoff(attempt)).await;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "automation request failed");
                    last_error = Some(e.to_string());
                    if policy.can_retry(attempt) {
                        tokio::time::sleep(policy.backoff(attempt)).await;
                    }
                }
            }
        }

        let mut result = AutomationResult::failed(
            last_error.unwrap_or_else(|| "All retry attempts failed".to_owned()),
            true,
        )
        .with_tracking_id(last_tracking_id);
        result.status_code = last_status;
        result
    }

    async fn health_check(&self) -> AutomationResult {
        debug!(url = %self.health_endpoint, "checking automation health");

        let response = self
            .http
            .head(self.health_endpoint.clone())
            .timeout(self.config.health_timeout)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                let healthy = status < 500;
                let mut result = AutomationResult {
                    success: healthy,
                    message: Some(format!("Health check returned {status}")),
                    status_code: Some(status),
                    is_temporary: Some(!healthy),
                    ..AutomationResult::default()
                };
                if !healthy {
                    result.error = Some(format!("Health check returned {status}"));
                }
                result
            }
            Err(e) => {
                let error =
                    AutomationError::from_reqwest(e, self.config.health_timeout.as_secs());
                warn!(error = %error, "automation health check failed");
                AutomationResult::failed(error.to_string(), true)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
