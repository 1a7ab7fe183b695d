//! Markdown rendering of a plan for the chat transcript.

use crate::plan::{PlanStatus, Priority, StepStatus, WorkflowPlan};

fn plan_icon(status: PlanStatus) -> &'static str {
    match status {
        PlanStatus::Planning => "📋",
        PlanStatus::Executing => "⚡",
        PlanStatus::Completed => "✅",
        PlanStatus::Failed => "❌",
        PlanStatus::Paused => "⏸️",
    }
}

fn step_icon(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "⏳",
        StepStatus::InProgress => "⚡",
        StepStatus::Completed => "✅",
        StepStatus::Failed => "❌",
        StepStatus::Skipped => "⏭️",
    }
}

fn priority_icon(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "🔴",
        Priority::Medium => "🟡",
        Priority::Low => "🟢",
    }
}

/// Ten-cell bar, one filled cell per full ten percent.
fn progress_bar(percentage: u32) -> String {
    let filled = (percentage / 10).min(10) as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}

/// Render `plan` as Markdown: header, progress bar, then one entry per step.
pub fn format_workflow_display(plan: &WorkflowPlan) -> String {
    let mut out = format!("{} **{}**\n\n", plan_icon(plan.status), plan.title);
    out.push_str(&format!(
        "📊 **ความคืบหน้า**: {}% [{}]\n",
        plan.progress.percentage,
        progress_bar(plan.progress.percentage)
    ));
    out.push_str(&format!(
        "⏱️ **เวลาประมาณ**: {} นาที\n\n",
        plan.total_estimated_duration
    ));
    out.push_str("🔄 **ขั้นตอนการทำงาน**:\n\n");

    for (index, step) in plan.steps.iter().enumerate() {
        out.push_str(&format!(
            "**{}.** {} {} **{}**\n",
            index + 1,
            step_icon(step.status),
            priority_icon(step.priority),
            step.title
        ));
        out.push_str(&format!("   {}\n", step.description));

        if !step.dependencies.is_empty() {
            // Unknown ids render as 0.
            let numbers: Vec<String> = step
                .dependencies
                .iter()
                .map(|dep| {
                    plan.steps
                        .iter()
                        .position(|s| &s.id == dep)
                        .map_or(0, |i| i + 1)
                        .to_string()
                })
                .collect();
            out.push_str(&format!("   📎 รอขั้นตอน: {}\n", numbers.join(", ")));
        }

        match step.status {
            StepStatus::Completed if step.result.is_some() => out.push_str("   ✅ สำเร็จ\n"),
            StepStatus::Failed => {
                if let Some(error) = &step.error {
                    out.push_str(&format!("   ❌ ล้มเหลว: {error}\n"));
                }
            }
            StepStatus::InProgress => out.push_str("   ⚡ กำลังดำเนินการ...\n"),
            _ => {}
        }
        out.push('\n');
    }

    if plan.status == PlanStatus::Completed {
        let seconds = match (plan.started_at, plan.completed_at) {
            (Some(start), Some(end)) => {
                ((end - start).num_milliseconds() as f64 / 1000.0).round() as i64
            }
            _ => 0,
        };
        out.push_str(&format!("🎉 **เสร็จสิ้น** ใช้เวลา {seconds} วินาที\n"));
    }

    out
}
