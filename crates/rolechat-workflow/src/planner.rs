//! Workflow planner: turns a request into a [`WorkflowPlan`].
//!
//! Detected intents become a linear chain in the fixed order meeting, email,
//! post.  A trailing reminder depending on every earlier step is added when
//! a meeting or email is involved.  Planning performs no I/O.

use crate::analyzer::{AnalysisResult, RequestAnalyzer};
use crate::error::Result;
use crate::plan::{
    EmailParameters, MeetingParameters, PostParameters, Priority, ReminderParameters,
    StepParameters, WorkflowPlan, WorkflowStep,
};

const REMINDER_TIME: &str = "1 hour before";
const REMINDER_MESSAGE: &str = "ติดตามผลการประชุมและ feedback";

/// Plans workflows using a compiled [`RequestAnalyzer`].
#[derive(Debug, Clone)]
pub struct WorkflowPlanner {
    analyzer: RequestAnalyzer,
}

impl WorkflowPlanner {
    pub fn new() -> Result<Self> {
        Ok(Self::with_analyzer(RequestAnalyzer::new()?))
    }

    pub fn with_analyzer(analyzer: RequestAnalyzer) -> Self {
        Self { analyzer }
    }

    pub fn analyzer(&self) -> &RequestAnalyzer {
        &self.analyzer
    }

    /// Whether the chat flow should plan a workflow for `text`.
    pub fn should_plan(&self, text: &str) -> bool {
        self.analyzer.should_plan(text)
    }

    /// Synthesize a plan for `request`.
    ///
    /// A request with no detectable intent yields a plan with zero steps.
    pub fn plan(&self, request: &str) -> WorkflowPlan {
        let analysis = self.analyzer.analyze(request);
        let steps = build_steps(&analysis);
        let title = format!("Workflow: {}", analysis.components().join(" + "));
        let plan = WorkflowPlan::new(title, request, steps);

        tracing::info!(
            plan_id = %plan.id,
            steps = plan.steps.len(),
            minutes = plan.total_estimated_duration,
            "workflow planned"
        );
        plan
    }
}

fn build_steps(analysis: &AnalysisResult) -> Vec<WorkflowStep> {
    let mut steps: Vec<WorkflowStep> = Vec::new();

    if let Some(meeting) = &analysis.meeting {
        push_chained(
            &mut steps,
            WorkflowStep::new(
                "สร้างการประชุม",
                format!("สร้างการประชุม: {}", meeting.title),
                StepParameters::Meeting(MeetingParameters {
                    time: meeting.time.clone(),
                    title: meeting.title.clone(),
                    description: meeting.description.clone(),
                    attendees: meeting.attendees.clone(),
                }),
                Priority::High,
                2,
            ),
        );
    }

    if let Some(email) = &analysis.email {
        push_chained(
            &mut steps,
            WorkflowStep::new(
                "ส่ง Email แจ้งเตือน",
                format!("ส่ง email ถึง {} คน", email.recipients.len()),
                StepParameters::Email(EmailParameters {
                    recipients: email.recipients.clone(),
                    subject: email.subject.clone(),
                    body: email.body.clone(),
                    include_calendar_invite: analysis.has_meeting(),
                }),
                Priority::High,
                1,
            ),
        );
    }

    if let Some(post) = &analysis.post {
        push_chained(
            &mut steps,
            WorkflowStep::new(
                "โพสข้อความใน Team",
                format!("โพสข้อความเกี่ยวกับ {}", post.topic),
                StepParameters::Post(PostParameters {
                    platform: post.platform.clone(),
                    message: post.message.clone(),
                    scheduled_time: post.scheduled_time.clone(),
                }),
                Priority::Medium,
                1,
            ),
        );
    }

    if analysis.has_meeting() || analysis.has_email() {
        let all: Vec<String> = steps.iter().map(|s| s.id.clone()).collect();
        steps.push(
            WorkflowStep::new(
                "ตั้งการแจ้งเตือน",
                "ตั้งการแจ้งเตือนสำหรับติดตามผล",
                StepParameters::Reminder(ReminderParameters {
                    reminder_time: REMINDER_TIME.to_owned(),
                    message: REMINDER_MESSAGE.to_owned(),
                }),
                Priority::Low,
                1,
            )
            .with_dependencies(all),
        );
    }

    steps
}

/// Append `step` depending on the current last step, if any.
fn push_chained(steps: &mut Vec<WorkflowStep>, step: WorkflowStep) {
    let dependencies = steps
        .last()
        .map(|prev| vec![prev.id.clone()])
        .unwrap_or_default();
    steps.push(step.with_dependencies(dependencies));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{PlanStatus, StepStatus, StepType};

    fn planner() -> WorkflowPlanner {
        WorkflowPlanner::new().expect("planner builds")
    }

    #[test]
    fn full_request_builds_chain_and_reminder() {
        let plan = planner().plan("ประชุมทีม 14 โมง ส่ง email ถึง a@x.com และโพสใน team");
        let types: Vec<StepType> = plan.steps.iter().map(WorkflowStep::step_type).collect();
        assert_eq!(
            types,
            vec![StepType::Meeting, StepType::Email, StepType::Post, StepType::Reminder]
        );

        let [meeting, email, post, reminder] = &plan.steps[..] else {
            panic!("expected four steps");
        };
        assert!(meeting.dependencies.is_empty());
        assert_eq!(email.dependencies, vec![meeting.id.clone()]);
        assert_eq!(post.dependencies, vec![email.id.clone()]);
        assert_eq!(
            reminder.dependencies,
            vec![meeting.id.clone(), email.id.clone(), post.id.clone()]
        );

        assert_eq!(meeting.priority, Priority::High);
        assert_eq!(email.priority, Priority::High);
        assert_eq!(post.priority, Priority::Medium);
        assert_eq!(reminder.priority, Priority::Low);
        assert_eq!(email.description, "ส่ง email ถึง 1 คน");

        assert_eq!(plan.title, "Workflow: การประชุม + Email + Team Post");
        assert_eq!(plan.total_estimated_duration, 5);
        assert_eq!(plan.progress.total, 4);
        assert_eq!(plan.progress.completed, 0);
        assert_eq!(plan.status, PlanStatus::Planning);
        assert!(plan.steps.iter().all(|s| s.status == StepStatus::Pending));
        assert!(plan.steps.iter().all(|s| s.start_time.is_none()));
    }

    #[test]
    fn email_invite_follows_meeting() {
        let plan = planner().plan("meeting and email");
        match &plan.steps[1].parameters {
            StepParameters::Email(p) => assert!(p.include_calendar_invite),
            other => panic!("unexpected parameters: {other:?}"),
        }
    }

    #[test]
    fn post_only_has_no_reminder() {
        let plan = planner().plan("share this with the team");
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].step_type(), StepType::Post);
        assert!(plan.steps[0].dependencies.is_empty());
        assert_eq!(plan.title, "Workflow: Team Post");
    }

    #[test]
    fn no_intent_gives_empty_plan() {
        let plan = planner().plan("hello");
        assert!(plan.is_empty());
        assert_eq!(plan.progress.total, 0);
        assert_eq!(plan.progress.percentage, 0);
        assert_eq!(plan.total_estimated_duration, 0);
        assert_eq!(plan.description, "hello");
    }

    #[test]
    fn step_ids_are_unique() {
        let plan = planner().plan("meeting email post");
        let mut ids: Vec<&str> = plan.steps.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), plan.steps.len());
    }
}
