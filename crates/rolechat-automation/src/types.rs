//! Wire types exchanged with the automation backend.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Value of the `source` field on every trigger request.
pub const REQUEST_SOURCE: &str = "Role-Chat-Interface";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// JSON body POSTed to the trigger endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    pub description: String,
    /// RFC 3339 time the attempt was sent.
    pub timestamp: String,
    pub source: String,
    pub is_test: bool,
}

impl TriggerRequest {
    pub fn new(description: impl Into<String>, is_test: bool, now: DateTime<Utc>) -> Self {
        Self {
            description: description.into(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            source: REQUEST_SOURCE.to_owned(),
            is_test,
        }
    }
}

// ---------------------------------------------------------------------------
// Task results
// ---------------------------------------------------------------------------

/// One task reported back by a successful backend run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutomationTask {
    #[serde(default)]
    pub task_type: String,
    /// JSON-encoded details of the action the backend performed.
    #[serde(default, deserialize_with = "string_or_json")]
    pub action_details: String,
    /// JSON-encoded result payload.
    #[serde(default, deserialize_with = "string_or_json")]
    pub result: String,
    #[serde(default)]
    pub status: String,
}

impl AutomationTask {
    /// Whether the backend marked this task as successful.
    pub fn succeeded(&self) -> bool {
        self.status == "success"
    }
}

/// Accept either a JSON string or any other JSON value (re-encoded).
fn string_or_json<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Outcome of a trigger, test, or health call.
///
/// The client never returns an error to its callers: every failure mode is
/// described by `success == false` plus the classification flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Seconds the backend asked us to wait (429 responses).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_temporary: Option<bool>,
    /// The backend accepted the request and is still working on it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_processing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<AutomationTask>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_summary: Option<String>,
}

impl AutomationResult {
    /// A successful result carrying a short message.
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// A failed result with its temporary/permanent classification.
    pub fn failed(error: impl Into<String>, is_temporary: bool) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            is_temporary: Some(is_temporary),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_tracking_id(mut self, tracking_id: Option<String>) -> Self {
        self.tracking_id = tracking_id;
        self
    }

    pub fn with_flow_summary(mut self, summary: impl Into<String>) -> Self {
        self.flow_summary = Some(summary.into());
        self
    }

    /// True when the failure is worth retrying later.
    pub fn is_temporary(&self) -> bool {
        self.is_temporary.unwrap_or(false)
    }

    /// True when the backend is still processing in the background.
    pub fn is_processing(&self) -> bool {
        self.is_processing.unwrap_or(false)
    }

    /// Render the bilingual, user-facing text for this outcome.
    pub fn user_message(&self) -> String {
        if self.success {
            return self.success_message();
        }

        let error = self.error.as_deref().unwrap_or("ไม่สามารถดำเนินการได้");
        let status = self
            .status_code
            .map(|code| format!("HTTP {code}"))
            .unwrap_or_else(|| "ไม่ทราบ".to_owned());
        let (kind, advice) = if self.is_temporary() {
            ("ข้อผิดพลาดชั่วคราว", "ลองใหม่อีกครั้งในอีกสักครู่")
        } else {
            ("ข้อผิดพลาดถาวร", "ตรวจสอบการตั้งค่าระบบอัตโนมัติ")
        };

        let mut text = format!(
            "❌ **เกิดข้อผิดพลาด**\n\n{error}\n\n🔧 **รายละเอียด:**\n- สถานะ: {status}\n- ประเภท: {kind}\n\n💡 **คำแนะนำ:** {advice}"
        );
        if let Some(id) = &self.tracking_id {
            text.push_str(&format!("\n\n🆔 **Tracking ID:** {id}"));
        }
        text
    }

    fn success_message(&self) -> String {
        let body = self
            .flow_summary
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("ระบบอัตโนมัติทำงานเสร็จเรียบร้อยแล้ว");

        let mut text = if self.is_processing() {
            format!("🔄 **กำลังดำเนินการ...**\n\n{body}")
        } else {
            format!("✅ **ดำเนินการสำเร็จ!**\n\n{body}")
        };
        if let Some(id) = &self.tracking_id {
            let short: String = id.chars().take(8).collect();
            text.push_str(&format!("\n- Tracking ID: {short}..."));
        }
        text
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_camel_case() {
        let now = Utc::now();
        let req = TriggerRequest::new("hello", true, now);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["description"], "hello");
        assert_eq!(v["source"], REQUEST_SOURCE);
        assert_eq!(v["isTest"], true);
        assert!(v["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn result_skips_absent_fields() {
        let v = serde_json::to_value(AutomationResult::succeeded("ok")).unwrap();
        assert_eq!(v, json!({"success": true, "message": "ok"}));
    }

    #[test]
    fn task_accepts_object_action_details() {
        let task: AutomationTask = serde_json::from_value(json!({
            "task_type": "send_email",
            "action_details": {"recipients": ["a@b.com"]},
            "status": "success"
        }))
        .unwrap();
        assert_eq!(task.action_details, r#"{"recipients":["a@b.com"]}"#);
        assert!(task.result.is_empty());
        assert!(task.succeeded());
    }

    #[test]
    fn failure_message_marks_temporary_and_tracking_id() {
        let result = AutomationResult::failed("Bad Gateway", true)
            .with_status(502)
            .with_tracking_id(Some("abc-123".into()));
        let text = result.user_message();
        assert!(text.contains("HTTP 502"));
        assert!(text.contains("ข้อผิดพลาดชั่วคราว"));
        assert!(text.contains("🆔 **Tracking ID:** abc-123"));
    }

    #[test]
    fn failure_message_without_status() {
        let text = AutomationResult::failed("nope", false).user_message();
        assert!(text.contains("ไม่ทราบ"));
        assert!(text.contains("ข้อผิดพลาดถาวร"));
        assert!(!text.contains("Tracking ID"));
    }

    #[test]
    fn processing_message_uses_flow_summary() {
        let mut result = AutomationResult::succeeded("queued").with_flow_summary("working on it");
        result.is_processing = Some(true);
        let text = result.user_message();
        assert!(text.starts_with("🔄"));
        assert!(text.contains("working on it"));
    }
}
