//! Classification of backend error bodies.
//!
//! Error responses carry `{"error": {"code", "message", "trackingId"}}`.
//! The code decides the user-facing message and whether the failure is
//! temporary.  `NoResponse` is not a failure at all: the backend accepted the
//! run and is finishing it asynchronously.

use serde_json::Value;

/// Known backend error codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendErrorCode {
    NoResponse,
    WorkflowRunInProgress,
    WorkflowRunTimeout,
    TriggerNotFound,
    Forbidden,
    Other(String),
}

impl From<&str> for BackendErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "NoResponse" => Self::NoResponse,
            "WorkflowRunInProgress" => Self::WorkflowRunInProgress,
            "WorkflowRunTimeout" => Self::WorkflowRunTimeout,
            "TriggerNotFound" => Self::TriggerNotFound,
            "Forbidden" => Self::Forbidden,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// How an error response should be reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassification {
    pub message: String,
    pub is_temporary: bool,
    /// The run was accepted and continues in the background.
    pub is_processing: bool,
    pub tracking_id: Option<String>,
}

impl ErrorClassification {
    fn new(message: impl Into<String>, is_temporary: bool) -> Self {
        Self {
            message: message.into(),
            is_temporary,
            is_processing: false,
            tracking_id: None,
        }
    }
}

/// Classify a parsed error body.
pub fn classify_error_body(body: &Value) -> ErrorClassification {
    let Some(error) = body.get("error").filter(|e| e.is_object()) else {
        return ErrorClassification::new("Unknown backend error", true);
    };

    let code = error.get("code").and_then(Value::as_str).unwrap_or_default();
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let tracking_id = error
        .get("trackingId")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let mut classification = match BackendErrorCode::from(code) {
        BackendErrorCode::NoResponse => ErrorClassification {
            message: "Workflow triggered but no immediate response (likely processing in background)"
                .into(),
            is_temporary: false,
            is_processing: true,
            tracking_id: None,
        },
        BackendErrorCode::WorkflowRunInProgress => {
            ErrorClassification::new("Another workflow run is in progress", true)
        }
        BackendErrorCode::WorkflowRunTimeout => {
            ErrorClassification::new("Workflow execution timed out", true)
        }
        BackendErrorCode::TriggerNotFound => {
            ErrorClassification::new("Workflow trigger not found or disabled", false)
        }
        BackendErrorCode::Forbidden => ErrorClassification::new("Access denied to workflow", false),
        BackendErrorCode::Other(code) => ErrorClassification::new(
            format!("Backend error: {code} - {message}"),
            code.contains("Timeout") || code.contains("NoResponse"),
        ),
    };
    classification.tracking_id = tracking_id;
    classification
}

/// Classify an error response whose body is absent or not JSON.
pub fn classify_bare_status(status: u16) -> ErrorClassification {
    match status {
        502 => ErrorClassification::new("Bad Gateway", true),
        s if s >= 500 => ErrorClassification::new("Server error", true),
        _ => ErrorClassification::new("Client error", false),
    }
}

/// Classify an error response from its status and raw body text.
pub fn classify_response(status: u16, body: &str) -> ErrorClassification {
    match serde_json::from_str::<Value>(body.trim()) {
        Ok(value) if !value.is_null() => classify_error_body(&value),
        _ => classify_bare_status(status),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
