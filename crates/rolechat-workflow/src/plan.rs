//! Workflow plan data model.
//!
//! A [`WorkflowPlan`] owns an ordered list of [`WorkflowStep`]s.  Steps carry
//! typed [`StepParameters`]; on the wire the step's `type` tag sits beside a
//! `parameters` object whose shape depends on that tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Kind of work a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Meeting,
    Email,
    Post,
    Reminder,
    Task,
    Analysis,
}

/// Lifecycle state of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

/// Failure-propagation priority.  Only `High` aborts a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Lifecycle state of a whole plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Planning,
    Executing,
    Completed,
    Failed,
    Paused,
}

// ---------------------------------------------------------------------------
// Step parameters
// ---------------------------------------------------------------------------

/// Parameters of a meeting step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeetingParameters {
    pub time: String,
    pub title: String,
    pub description: String,
    pub attendees: Vec<String>,
}

/// Parameters of an email step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailParameters {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub include_calendar_invite: bool,
}

/// Parameters of a post step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostParameters {
    pub platform: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
}

/// Parameters of a reminder step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReminderParameters {
    pub reminder_time: String,
    pub message: String,
}

/// Per-type step parameters.  The variant determines the step's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepParameters {
    Meeting(MeetingParameters),
    Email(EmailParameters),
    Post(PostParameters),
    Reminder(ReminderParameters),
    Task,
    Analysis,
}

impl StepParameters {
    /// The step type these parameters belong to.
    pub fn step_type(&self) -> StepType {
        match self {
            Self::Meeting(_) => StepType::Meeting,
            Self::Email(_) => StepType::Email,
            Self::Post(_) => StepType::Post,
            Self::Reminder(_) => StepType::Reminder,
            Self::Task => StepType::Task,
            Self::Analysis => StepType::Analysis,
        }
    }

    /// Empty parameters for `step_type`.
    pub fn default_for(step_type: StepType) -> Self {
        match step_type {
            StepType::Meeting => Self::Meeting(MeetingParameters::default()),
            StepType::Email => Self::Email(EmailParameters::default()),
            StepType::Post => Self::Post(PostParameters::default()),
            StepType::Reminder => Self::Reminder(ReminderParameters::default()),
            StepType::Task => Self::Task,
            StepType::Analysis => Self::Analysis,
        }
    }

    /// Interpret a wire `parameters` object for `step_type`.
    ///
    /// A missing (`null`) object yields the type's defaults.
    pub fn from_value(step_type: StepType, value: Value) -> serde_json::Result<Self> {
        if value.is_null() {
            return Ok(Self::default_for(step_type));
        }
        Ok(match step_type {
            StepType::Meeting => Self::Meeting(serde_json::from_value(value)?),
            StepType::Email => Self::Email(serde_json::from_value(value)?),
            StepType::Post => Self::Post(serde_json::from_value(value)?),
            StepType::Reminder => Self::Reminder(serde_json::from_value(value)?),
            StepType::Task => Self::Task,
            StepType::Analysis => Self::Analysis,
        })
    }

    /// Wire form of the parameters object.
    pub fn to_value(&self) -> Value {
        let value = match self {
            Self::Meeting(p) => serde_json::to_value(p),
            Self::Email(p) => serde_json::to_value(p),
            Self::Post(p) => serde_json::to_value(p),
            Self::Reminder(p) => serde_json::to_value(p),
            Self::Task | Self::Analysis => return Value::Object(Map::new()),
        };
        value.unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

// ---------------------------------------------------------------------------
// WorkflowStep
// ---------------------------------------------------------------------------

/// A unit of work inside a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStep", into = "RawStep")]
pub struct WorkflowStep {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Ids of steps that must complete before this one runs.
    pub dependencies: Vec<String>,
    /// Informational estimate in minutes.
    pub estimated_duration: u32,
    pub priority: Priority,
    pub parameters: StepParameters,
    pub status: StepStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl WorkflowStep {
    /// Create a pending step with a fresh id and no dependencies.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        parameters: StepParameters,
        priority: Priority,
        estimated_duration: u32,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            title: title.into(),
            description: description.into(),
            dependencies: Vec::new(),
            estimated_duration,
            priority,
            parameters,
            status: StepStatus::Pending,
            result: None,
            error: None,
            start_time: None,
            end_time: None,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn step_type(&self) -> StepType {
        self.parameters.step_type()
    }
}

/// Wire representation of a step.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStep {
    id: String,
    #[serde(rename = "type")]
    step_type: StepType,
    title: String,
    description: String,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    estimated_duration: u32,
    priority: Priority,
    #[serde(default)]
    parameters: Value,
    status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_time: Option<DateTime<Utc>>,
}

impl TryFrom<RawStep> for WorkflowStep {
    type Error = serde_json::Error;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        Ok(Self {
            parameters: StepParameters::from_value(raw.step_type, raw.parameters)?,
            id: raw.id,
            title: raw.title,
            description: raw.description,
            dependencies: raw.dependencies,
            estimated_duration: raw.estimated_duration,
            priority: raw.priority,
            status: raw.status,
            result: raw.result,
            error: raw.error,
            start_time: raw.start_time,
            end_time: raw.end_time,
        })
    }
}

impl From<WorkflowStep> for RawStep {
    fn from(step: WorkflowStep) -> Self {
        Self {
            step_type: step.step_type(),
            parameters: step.parameters.to_value(),
            id: step.id,
            title: step.title,
            description: step.description,
            dependencies: step.dependencies,
            estimated_duration: step.estimated_duration,
            priority: step.priority,
            status: step.status,
            result: step.result,
            error: step.error,
            start_time: step.start_time,
            end_time: step.end_time,
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Completion counters of a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: u32,
    pub total: u32,
    pub percentage: u32,
}

impl Progress {
    /// Progress with `completed` of `total` done, percentage rounded half up.
    pub fn new(completed: u32, total: u32) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            ((200 * u64::from(completed) + u64::from(total)) / (2 * u64::from(total))) as u32
        };
        Self {
            completed,
            total,
            percentage,
        }
    }

    /// Count completed steps.
    pub fn from_steps(steps: &[WorkflowStep]) -> Self {
        let completed = steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        Self::new(saturate(completed), saturate(steps.len()))
    }
}

fn saturate(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// WorkflowPlan
// ---------------------------------------------------------------------------

/// An ordered set of steps synthesized from one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPlan {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Creation order, not execution order.
    pub steps: Vec<WorkflowStep>,
    pub total_estimated_duration: u32,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: Progress,
}

impl WorkflowPlan {
    /// Create a plan in `planning` state with a fresh id.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        steps: Vec<WorkflowStep>,
    ) -> Self {
        let total_estimated_duration = steps.iter().map(|s| s.estimated_duration).sum();
        let progress = Progress::from_steps(&steps);
        Self {
            id: Uuid::now_v7().to_string(),
            title: title.into(),
            description: description.into(),
            steps,
            total_estimated_duration,
            status: PlanStatus::Planning,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            progress,
        }
    }

    /// A plan with no steps has nothing to execute.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn step_mut(&mut self, id: &str) -> Option<&mut WorkflowStep> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// Recount completed steps against the step count.
    pub fn recompute_progress(&mut self) {
        self.progress = Progress::from_steps(&self.steps);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meeting_step() -> WorkflowStep {
        WorkflowStep::new(
            "สร้างการประชุม",
            "สร้างการประชุม: ประชุมทีม",
            StepParameters::Meeting(MeetingParameters {
                time: "14:00".into(),
                title: "ประชุมทีม".into(),
                description: "ประชุมทีม 14:00".into(),
                attendees: vec!["a@b.com".into()],
            }),
            Priority::High,
            2,
        )
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(Progress::new(1, 3).percentage, 33);
        assert_eq!(Progress::new(2, 3).percentage, 67);
        assert_eq!(Progress::new(1, 8).percentage, 13);
        assert_eq!(Progress::new(4, 4).percentage, 100);
    }

    #[test]
    fn empty_progress_is_zero() {
        assert_eq!(Progress::new(0, 0), Progress::default());
    }

    #[test]
    fn step_wire_shape() {
        let step = meeting_step();
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value["type"], "meeting");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["priority"], "high");
        assert_eq!(value["estimatedDuration"], 2);
        assert_eq!(value["parameters"]["time"], "14:00");
        assert_eq!(value["parameters"]["attendees"], json!(["a@b.com"]));
        assert!(value.get("startTime").is_none());
        assert!(value.get("result").is_none());
    }

    #[test]
    fn step_deserializes_by_type_tag() {
        let step: WorkflowStep = serde_json::from_value(json!({
            "id": "s1",
            "type": "post",
            "title": "t",
            "description": "d",
            "priority": "medium",
            "status": "in_progress",
            "parameters": {"platform": "Microsoft Teams", "message": "hi", "scheduledTime": "13:00"},
            "startTime": "2024-05-01T09:00:00Z"
        }))
        .unwrap();
        assert_eq!(step.step_type(), StepType::Post);
        assert_eq!(step.status, StepStatus::InProgress);
        assert!(step.start_time.is_some());
        match step.parameters {
            StepParameters::Post(p) => assert_eq!(p.scheduled_time.as_deref(), Some("13:00")),
            other => panic!("unexpected parameters: {other:?}"),
        }
    }

    #[test]
    fn missing_parameters_use_defaults() {
        let step: WorkflowStep = serde_json::from_value(json!({
            "id": "s1", "type": "reminder", "title": "t", "description": "d",
            "priority": "low", "status": "pending"
        }))
        .unwrap();
        assert_eq!(
            step.parameters,
            StepParameters::Reminder(ReminderParameters::default())
        );
    }

    #[test]
    fn plan_totals_and_lookup() {
        let step = meeting_step();
        let id = step.id.clone();
        let plan = WorkflowPlan::new("Workflow: การประชุม", "req", vec![step]);
        assert_eq!(plan.total_estimated_duration, 2);
        assert_eq!(plan.progress, Progress::new(0, 1));
        assert_eq!(plan.status, PlanStatus::Planning);
        assert!(plan.step(&id).is_some());
        assert!(plan.step("missing").is_none());

        let value = serde_json::to_value(&plan).unwrap();
        assert!(value.get("totalEstimatedDuration").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("startedAt").is_none());
        let back: WorkflowPlan = serde_json::from_value(value).unwrap();
        assert_eq!(back, plan);
    }
}
