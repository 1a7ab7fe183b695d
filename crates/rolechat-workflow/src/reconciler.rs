//! Status reconciliation for plans updated out of band.
//!
//! External systems report progress as [`WorkflowUpdate`]s.  [`reconcile`]
//! folds them into a copy of a plan; [`normalize_plan`] turns arbitrary JSON
//! into a well-formed plan without ever failing.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Result, WorkflowError};
use crate::plan::{
    PlanStatus, Priority, Progress, StepParameters, StepStatus, StepType, WorkflowPlan,
    WorkflowStep,
};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Kind of status change carried by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    StepInProgress,
    StepCompleted,
    StepFailed,
    WorkflowExecuting,
    WorkflowCompleted,
    WorkflowFailed,
    #[serde(other)]
    Unknown,
}

impl From<&str> for UpdateStatus {
    fn from(s: &str) -> Self {
        serde_json::from_value(Value::String(s.to_owned())).unwrap_or(Self::Unknown)
    }
}

/// A progress report for one plan, optionally targeting a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowUpdate {
    #[serde(default)]
    pub workflow_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    pub status: UpdateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl WorkflowUpdate {
    pub fn new(workflow_id: impl Into<String>, status: UpdateStatus) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            step_id: None,
            status,
            progress: None,
            message: None,
            timestamp: Utc::now(),
            data: None,
        }
    }

    pub fn for_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Apply `updates` in order to a copy of `plan`, then recount progress.
///
/// Updates naming unknown steps are ignored.  The update's workflow id is
/// not checked against the plan.  The input plan is left untouched.
pub fn reconcile(plan: &WorkflowPlan, updates: &[WorkflowUpdate]) -> WorkflowPlan {
    let mut next = plan.clone();

    for update in updates {
        match &update.step_id {
            Some(step_id) => apply_step_update(&mut next, step_id, update),
            None => apply_plan_update(&mut next, update),
        }
    }

    next.recompute_progress();
    next
}

fn apply_step_update(plan: &mut WorkflowPlan, step_id: &str, update: &WorkflowUpdate) {
    let Some(step) = plan.step_mut(step_id) else {
        debug!(step_id, "ignoring update for unknown step");
        return;
    };
    match update.status {
        UpdateStatus::StepInProgress => {
            step.status = StepStatus::InProgress;
            step.start_time = Some(update.timestamp);
        }
        UpdateStatus::StepCompleted => {
            step.status = StepStatus::Completed;
            step.end_time = Some(update.timestamp);
            step.result = update.data.clone();
        }
        UpdateStatus::StepFailed => {
            step.status = StepStatus::Failed;
            step.error = update.message.clone();
            step.end_time = Some(update.timestamp);
        }
        other => debug!(step_id, status = ?other, "status does not apply to a step"),
    }
}

fn apply_plan_update(plan: &mut WorkflowPlan, update: &WorkflowUpdate) {
    match update.status {
        UpdateStatus::WorkflowExecuting => {
            plan.status = PlanStatus::Executing;
            plan.started_at = Some(update.timestamp);
        }
        UpdateStatus::WorkflowCompleted => {
            plan.status = PlanStatus::Completed;
            plan.completed_at = Some(update.timestamp);
        }
        UpdateStatus::WorkflowFailed => {
            plan.status = PlanStatus::Failed;
            plan.completed_at = Some(update.timestamp);
        }
        other => debug!(plan_id = %plan.id, status = ?other, "status does not apply to a workflow"),
    }
}

/// JSON entry point: normalize the plan, parse the updates, reconcile.
///
/// A non-array `updates` leaves the normalized plan as is.  Malformed
/// individual updates are skipped.
pub fn reconcile_value(plan: &Value, updates: &Value) -> WorkflowPlan {
    let plan = normalize_plan(plan);
    let Some(items) = updates.as_array() else {
        warn!("updates is not an array, skipping reconciliation");
        return plan;
    };

    let parsed: Vec<WorkflowUpdate> = items
        .iter()
        .filter_map(|item| match parse_update(item) {
            Ok(update) => Some(update),
            Err(e) => {
                warn!(error = %e, "skipping malformed workflow update");
                None
            }
        })
        .collect();

    reconcile(&plan, &parsed)
}

// ---------------------------------------------------------------------------
// Parsing external input
// ---------------------------------------------------------------------------

/// Parse one update leniently.  Only `status` is required.
pub fn parse_update(value: &Value) -> Result<WorkflowUpdate> {
    let obj = value.as_object().ok_or_else(|| WorkflowError::InvalidUpdate {
        reason: "update is not an object".into(),
    })?;
    let status = obj
        .get("status")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| WorkflowError::InvalidUpdate {
            reason: "missing status".into(),
        })?;

    Ok(WorkflowUpdate {
        workflow_id: text(obj, "workflowId").unwrap_or_default(),
        step_id: text(obj, "stepId"),
        status: UpdateStatus::from(status),
        progress: obj.get("progress").and_then(Value::as_f64),
        message: obj.get("message").and_then(Value::as_str).map(str::to_owned),
        timestamp: timestamp(obj, "timestamp").unwrap_or_else(Utc::now),
        data: obj.get("data").filter(|v| !v.is_null()).cloned(),
    })
}

/// Interpret a webhook body.  Requires both `status` and `workflowId`.
pub fn parse_webhook(value: &Value) -> Option<WorkflowUpdate> {
    let has_workflow = value
        .get("workflowId")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty());
    if !has_workflow {
        return None;
    }
    parse_update(value).ok()
}

/// Normalize `value` into a plan, or `None` if it is not an object.
pub fn validate_workflow(value: &Value) -> Option<WorkflowPlan> {
    value.is_object().then(|| normalize_plan(value))
}

/// Best-effort conversion of arbitrary JSON into a well-formed plan.
///
/// Every missing or malformed field takes its default; progress is always
/// recounted from the steps.
pub fn normalize_plan(value: &Value) -> WorkflowPlan {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or_else(|| {
        warn!("workflow is not an object, using an empty plan");
        &empty
    });

    let steps: Vec<WorkflowStep> = obj
        .get("steps")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| normalize_step(i, item))
                .collect()
        })
        .unwrap_or_default();

    let total_estimated_duration = number(obj, "totalEstimatedDuration")
        .unwrap_or_else(|| steps.iter().map(|s| s.estimated_duration).sum());

    WorkflowPlan {
        id: text(obj, "id").unwrap_or_else(|| "unknown".to_owned()),
        title: text(obj, "title").unwrap_or_else(|| "Untitled Workflow".to_owned()),
        description: text(obj, "description").unwrap_or_default(),
        progress: Progress::from_steps(&steps),
        steps,
        total_estimated_duration,
        status: enum_field(obj, "status").unwrap_or(PlanStatus::Planning),
        created_at: timestamp(obj, "createdAt").unwrap_or_else(Utc::now),
        started_at: timestamp(obj, "startedAt"),
        completed_at: timestamp(obj, "completedAt"),
    }
}

fn normalize_step(index: usize, value: &Value) -> Option<WorkflowStep> {
    let Some(obj) = value.as_object() else {
        warn!(index, "dropping step that is not an object");
        return None;
    };

    let step_type: StepType = enum_field(obj, "type").unwrap_or(StepType::Task);
    let parameters = obj
        .get("parameters")
        .cloned()
        .and_then(|v| StepParameters::from_value(step_type, v).ok())
        .unwrap_or_else(|| StepParameters::default_for(step_type));

    Some(WorkflowStep {
        id: text(obj, "id").unwrap_or_else(|| format!("step-{index}")),
        title: text(obj, "title").unwrap_or_else(|| "Untitled Step".to_owned()),
        description: text(obj, "description").unwrap_or_default(),
        dependencies: obj
            .get("dependencies")
            .and_then(Value::as_array)
            .map(|deps| {
                deps.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default(),
        estimated_duration: number(obj, "estimatedDuration").unwrap_or(0),
        priority: enum_field(obj, "priority").unwrap_or(Priority::Medium),
        parameters,
        status: enum_field(obj, "status").unwrap_or(StepStatus::Pending),
        result: obj.get("result").filter(|v| !v.is_null()).cloned(),
        error: text(obj, "error"),
        start_time: timestamp(obj, "startTime"),
        end_time: timestamp(obj, "endTime"),
    })
}

// -- Field helpers ----------------------------------------------------------

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn number(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    obj.get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

fn timestamp(obj: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    obj.get(key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn enum_field<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Option<T> {
    obj.get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
