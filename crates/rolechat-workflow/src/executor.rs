//! Topological workflow executor.
//!
//! Steps run strictly one at a time in dependency order.  Each step is
//! dispatched to an [`Automation`] backend with a per-type description; the
//! executor itself never fails and always returns the plan as it ended up.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rolechat_automation::Automation;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::error::{Result, WorkflowError};
use crate::plan::{PlanStatus, Priority, StepParameters, StepStatus, WorkflowPlan, WorkflowStep};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Executor tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Pause between consecutive steps.
    pub step_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(500),
        }
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Indices of `steps` in dependency order.
///
/// Depth-first over `dependencies`, roots taken in array order, so
/// independent steps keep their creation order.  Dependencies naming unknown
/// ids are ignored.  A cycle yields [`WorkflowError::CyclicDependency`].
pub fn execution_order(steps: &[WorkflowStep]) -> Result<Vec<usize>> {
    let index: HashMap<&str, usize> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    let mut marks = vec![Mark::Unvisited; steps.len()];
    let mut order = Vec::with_capacity(steps.len());

    for root in 0..steps.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::Visiting;
        // (step index, next dependency position)
        let mut stack = vec![(root, 0usize)];

        while let Some(&(node, pos)) = stack.last() {
            let Some(dep_id) = steps[node].dependencies.get(pos) else {
                marks[node] = Mark::Done;
                order.push(node);
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            let Some(&dep) = index.get(dep_id.as_str()) else {
                debug!(
                    step_id = %steps[node].id,
                    dependency = %dep_id,
                    "ignoring unknown dependency"
                );
                continue;
            };
            match marks[dep] {
                Mark::Done => {}
                Mark::Visiting => {
                    return Err(WorkflowError::CyclicDependency {
                        step_id: dep_id.clone(),
                    });
                }
                Mark::Unvisited => {
                    marks[dep] = Mark::Visiting;
                    stack.push((dep, 0));
                }
            }
        }
    }

    Ok(order)
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Description sent to the automation backend, or `None` for local steps.
pub fn dispatch_description(step: &WorkflowStep) -> Option<String> {
    let description = match &step.parameters {
        StepParameters::Meeting(p) => format!("สร้างการประชุม: {} เวลา {}", p.title, p.time),
        StepParameters::Email(p) => format!(
            "ส่ง email ถึง {} เรื่อง: {}",
            p.recipients.join(", "),
            p.subject
        ),
        StepParameters::Post(p) => format!("โพสข้อความใน {}: {}", p.platform, p.message),
        StepParameters::Reminder(p) => format!("ตั้งการแจ้งเตือน: {}", p.message),
        StepParameters::Task => format!("{}: {}", step.title, step.description),
        StepParameters::Analysis => return None,
    };
    Some(description)
}

fn analysis_result() -> Value {
    json!({
        "analysis": "completed",
        "insights": ["Task completed successfully"],
    })
}

// ---------------------------------------------------------------------------
// WorkflowExecutor
// ---------------------------------------------------------------------------

/// Runs plans against an automation backend.
pub struct WorkflowExecutor {
    automation: Arc<dyn Automation>,
    config: ExecutorConfig,
}

impl WorkflowExecutor {
    pub fn new(automation: Arc<dyn Automation>) -> Self {
        Self {
            automation,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute `plan` and return the resulting copy.
    ///
    /// Only `pending` steps are dispatched.  A step whose dependencies have
    /// not completed is skipped.  A failed high-priority step aborts the run
    /// and leaves the remaining steps untouched; any other failure demotes
    /// the step to `skipped`.
    pub async fn execute(&self, plan: &WorkflowPlan) -> WorkflowPlan {
        let mut run = plan.clone();
        run.status = PlanStatus::Executing;
        run.started_at = Some(Utc::now());
        run.recompute_progress();

        info!(
            plan_id = %run.id,
            title = %run.title,
            steps = run.steps.len(),
            "workflow execution started"
        );

        let order = match execution_order(&run.steps) {
            Ok(order) => order,
            Err(e) => {
                error!(plan_id = %run.id, error = %e, "workflow rejected");
                run.status = PlanStatus::Failed;
                run.completed_at = Some(Utc::now());
                return run;
            }
        };

        let mut dispatched = 0usize;
        for idx in order {
            if run.steps[idx].status != StepStatus::Pending {
                continue;
            }

            if let Some(dep) = unmet_dependency(&run.steps, idx) {
                let step = &mut run.steps[idx];
                warn!(step_id = %step.id, dependency = %dep, "skipping step with unmet dependency");
                step.status = StepStatus::Skipped;
                step.error = Some(format!("dependency {dep} did not complete"));
                continue;
            }

            if dispatched > 0 && !self.config.step_delay.is_zero() {
                tokio::time::sleep(self.config.step_delay).await;
            }
            dispatched += 1;

            let step = &mut run.steps[idx];
            step.status = StepStatus::InProgress;
            step.start_time = Some(Utc::now());
            debug!(step_id = %step.id, title = %step.title, "executing step");

            let outcome = self.run_step(step).await;
            let step = &mut run.steps[idx];
            step.end_time = Some(Utc::now());

            match outcome {
                Ok(result) => {
                    step.status = StepStatus::Completed;
                    step.result = Some(result);
                    info!(step_id = %step.id, title = %step.title, "step completed");
                    run.recompute_progress();
                }
                Err(reason) => {
                    step.status = StepStatus::Failed;
                    step.error = Some(reason);
                    error!(
                        step_id = %step.id,
                        title = %step.title,
                        error = ?step.error,
                        "step failed"
                    );

                    if step.priority == Priority::High {
                        run.status = PlanStatus::Failed;
                        break;
                    }
                    step.status = StepStatus::Skipped;
                    warn!(step_id = %step.id, "skipping non-critical step");
                }
            }
        }

        if run.status == PlanStatus::Executing {
            run.status = PlanStatus::Completed;
        }
        run.completed_at = Some(Utc::now());

        info!(
            plan_id = %run.id,
            status = ?run.status,
            completed = run.progress.completed,
            total = run.progress.total,
            "workflow execution finished"
        );
        run
    }

    async fn run_step(&self, step: &WorkflowStep) -> std::result::Result<Value, String> {
        let Some(description) = dispatch_description(step) else {
            return Ok(analysis_result());
        };

        let result = self.automation.trigger(&description, false).await;
        if result.success {
            Ok(serde_json::to_value(&result).unwrap_or_default())
        } else {
            Err(result
                .error
                .unwrap_or_else(|| "Automation request failed".to_owned()))
        }
    }
}

/// First dependency of `steps[idx]` that exists but has not completed.
fn unmet_dependency(steps: &[WorkflowStep], idx: usize) -> Option<String> {
    steps[idx]
        .dependencies
        .iter()
        .find(|dep| {
            steps
                .iter()
                .any(|s| &s.id == *dep && s.status != StepStatus::Completed)
        })
        .cloned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
