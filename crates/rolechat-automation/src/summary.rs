//! Human-readable reports built from backend task results.

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::types::AutomationTask;

/// Summary used when a successful response carries no task list.
pub const GENERIC_SUCCESS_SUMMARY: &str = "✅ Automation workflow ดำเนินการสำเร็จ";

/// Summary used when the task list is empty.
pub const NO_TASKS_SUMMARY: &str = "ไม่มีงานที่ดำเนินการ";

/// Build the per-task report with an aggregate success count.
pub fn summarize_tasks(tasks: &[AutomationTask]) -> String {
    if tasks.is_empty() {
        return NO_TASKS_SUMMARY.to_owned();
    }

    let mut summary = String::from("🔄 **การดำเนินงานอัตโนมัติ:**\n\n");

    for (index, task) in tasks.iter().enumerate() {
        let status_icon = if task.succeeded() { "✅" } else { "❌" };
        let (description, outcome) = describe_task(task);

        summary.push_str(&format!("**{}.** {status_icon} {description}\n", index + 1));
        if let Some(outcome) = outcome {
            summary.push_str(&outcome);
            summary.push('\n');
        }
        if !task.succeeded() {
            summary.push_str("   ❌ เกิดข้อผิดพลาด\n");
        }
        summary.push('\n');
    }

    let succeeded = tasks.iter().filter(|t| t.succeeded()).count();
    summary.push_str(&format!(
        "📊 **สรุป**: สำเร็จ {succeeded}/{} งาน",
        tasks.len()
    ));
    summary
}

/// Summary for a run the backend is still processing.
pub fn processing_summary(description: &str, at: DateTime<Local>) -> String {
    format!(
        "✅ Automation workflow กำลังประมวลผลในเบื้องหลัง\n\n\
         🔄 **สถานะ**: กำลังดำเนินการ\n\
         📋 **คำขอ**: {description}\n\
         ⏱️ **เวลา**: {}\n\n\
         💡 **หมายเหตุ**: ระบบอัตโนมัติกำลังประมวลผลคำขอของคุณ ผลลัพธ์จะปรากฏเมื่อเสร็จสิ้น",
        at.format("%H:%M:%S")
    )
}

// ---------------------------------------------------------------------------
// Per-task rendering
// ---------------------------------------------------------------------------

fn describe_task(task: &AutomationTask) -> (String, Option<String>) {
    let Ok(details) = serde_json::from_str::<Value>(&task.action_details) else {
        return generic(task);
    };
    let field = |name: &str| details.get(name).and_then(Value::as_str);

    match task.task_type.as_str() {
        "create_meeting" => {
            let mut description = String::from("📅 **สร้างการประชุม**");
            if let Some(time) = field("time") {
                description.push_str(&format!(" เวลา {time}"));
            }
            if let Some(text) = field("description") {
                description.push_str(&format!(": {text}"));
            }
            let outcome = (task.succeeded() && !task.result.is_empty())
                .then(|| meeting_outcome(&task.result));
            (description, outcome)
        }
        "send_email" => {
            let recipients: Vec<&str> = details
                .get("recipients")
                .and_then(Value::as_array)
                .map(|list| list.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();

            let mut description = String::from("📧 **ส่ง Email**");
            if details.get("recipients").is_some_and(Value::is_array) {
                description.push_str(&format!(" ถึง {} คน", recipients.len()));
            }
            if let Some(text) = field("description") {
                description.push_str(&format!(": {text}"));
            }
            let outcome = task.succeeded().then(|| {
                let mut outcome = String::from("   ✅ ส่ง Email สำเร็จ");
                if !recipients.is_empty() {
                    outcome.push_str(&format!("\n   👥 ผู้รับ: {}", recipients.join(", ")));
                }
                outcome
            });
            (description, outcome)
        }
        "post_message" => {
            let mut description = String::from("💬 **โพสข้อความ**");
            if let Some(platform) = field("platform") {
                description.push_str(&format!(" ใน {platform}"));
            }
            if let Some(time) = field("time") {
                description.push_str(&format!(" เวลา {time}"));
            }
            if let Some(text) = field("description") {
                description.push_str(&format!(": {text}"));
            }
            let outcome = (task.succeeded() && !task.result.is_empty())
                .then(|| post_outcome(&task.result));
            (description, outcome)
        }
        _ => generic(task),
    }
}

fn generic(task: &AutomationTask) -> (String, Option<String>) {
    (
        format!("⚙️ **{}**", task.task_type),
        task.succeeded()
            .then(|| "   ✅ ดำเนินการสำเร็จ".to_owned()),
    )
}

fn meeting_outcome(result: &str) -> String {
    let Ok(meeting) = serde_json::from_str::<Value>(result) else {
        return "   ✅ สร้างการประชุมสำเร็จ".to_owned();
    };
    let subject = meeting
        .get("subject")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let start = meeting
        .get("startWithTimeZone")
        .and_then(Value::as_str)
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|t| t.format("%d/%m/%Y %H:%M:%S").to_string())
                .unwrap_or_else(|_| raw.to_owned())
        })
        .unwrap_or_default();
    let link = link_label(meeting.get("webLink"));
    format!("   📋 หัวข้อ: {subject}\n   🕐 เวลา: {start}\n   🔗 ลิงก์: {link}")
}

fn post_outcome(result: &str) -> String {
    match serde_json::from_str::<Value>(result) {
        Ok(post) => format!(
            "   ✅ โพสข้อความสำเร็จ\n   🔗 ลิงก์: {}",
            link_label(post.get("messageLink"))
        ),
        Err(_) => "   ✅ โพสข้อความสำเร็จ".to_owned(),
    }
}

fn link_label(link: Option<&Value>) -> &'static str {
    match link.and_then(Value::as_str) {
        Some(s) if !s.is_empty() => "สร้างแล้ว",
        _ => "ไม่มี",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn task(task_type: &str, details: &str, result: &str, status: &str) -> AutomationTask {
        AutomationTask {
            task_type: task_type.into(),
            action_details: details.into(),
            result: result.into(),
            status: status.into(),
        }
    }

    #[test]
    fn empty_task_list() {
        assert_eq!(summarize_tasks(&[]), NO_TASKS_SUMMARY);
    }

    #[test]
    fn mixed_tasks_report() {
        let tasks = vec![
            task(
                "create_meeting",
                r#"{"time":"09:00","description":"standup"}"#,
                r#"{"subject":"Standup","startWithTimeZone":"2024-05-01T09:00:00+07:00","webLink":"https://x"}"#,
                "success",
            ),
            task(
                "send_email",
                r#"{"recipients":["a@b.com","c@d.com"]}"#,
                "",
                "success",
            ),
            task("post_message", r#"{"platform":"Teams"}"#, "", "failed"),
        ];
        let report = summarize_tasks(&tasks);
        assert!(report.contains("📅 **สร้างการประชุม** เวลา 09:00: standup"));
        assert!(report.contains("📋 หัวข้อ: Standup"));
        assert!(report.contains("🔗 ลิงก์: สร้างแล้ว"));
        assert!(report.contains("📧 **ส่ง Email** ถึง 2 คน"));
        assert!(report.contains("👥 ผู้รับ: a@b.com, c@d.com"));
        assert!(report.contains("**3.** ❌ 💬 **โพสข้อความ** ใน Teams"));
        assert!(report.contains("   ❌ เกิดข้อผิดพลาด"));
        assert!(report.ends_with("📊 **สรุป**: สำเร็จ 2/3 งาน"));
    }

    #[test]
    fn unparseable_details_fall_back_to_generic() {
        let report = summarize_tasks(&[task("create_meeting", "not json", "", "success")]);
        assert!(report.contains("⚙️ **create_meeting**"));
        assert!(report.contains("✅ ดำเนินการสำเร็จ"));
    }

    #[test]
    fn meeting_result_not_json() {
        let report = summarize_tasks(&[task("create_meeting", "{}", "plain", "success")]);
        assert!(report.contains("✅ สร้างการประชุมสำเร็จ"));
    }

    #[test]
    fn processing_summary_echoes_request() {
        let text = processing_summary("ส่ง email", Local::now());
        assert!(text.contains("📋 **คำขอ**: ส่ง email"));
    }
}
