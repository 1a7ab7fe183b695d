//! Workflow planning and execution for Role Chat.
//!
//! This crate provides:
//!
//! - **Analysis**: bilingual intent detection over a chat message via
//!   [`analyzer::RequestAnalyzer`].
//! - **Planning**: a dependency-ordered [`plan::WorkflowPlan`] synthesized
//!   by [`planner::WorkflowPlanner`].
//! - **Execution**: sequential, dependency-respecting dispatch to an
//!   automation backend via [`executor::WorkflowExecutor`].
//! - **Reconciliation**: folding out-of-band status updates into a plan via
//!   [`reconciler`].
//! - **Display**: Markdown rendering of a plan via [`display`].

pub mod analyzer;
pub mod display;
pub mod error;
pub mod executor;
pub mod plan;
pub mod planner;
pub mod reconciler;

pub use analyzer::{AnalysisResult, RequestAnalyzer};
pub use display::format_workflow_display;
pub use error::{Result, WorkflowError};
pub use executor::{ExecutorConfig, WorkflowExecutor, execution_order};
pub use plan::{
    PlanStatus, Priority, Progress, StepParameters, StepStatus, StepType, WorkflowPlan,
    WorkflowStep,
};
pub use planner::WorkflowPlanner;
pub use reconciler::{
    UpdateStatus, WorkflowUpdate, normalize_plan, parse_webhook, reconcile, reconcile_value,
    validate_workflow,
};
