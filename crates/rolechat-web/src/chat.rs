//! The chat turn: persist, plan, execute, reply.
//!
//! [`ChatService`] ties the conversation store, the workflow engine, the
//! automation backend, and the optional responder together.  Every public
//! operation returns a value; failures are folded into the result.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use rolechat_agent::{ChatMessage, Responder, ResponseRequest, WorkflowOutcome, fallback_response};
use rolechat_automation::{Automation, AutomationResult};
use rolechat_store::{Conversation, ConversationStore, Message, Role, StoreResult};
use rolechat_workflow::{
    ExecutorConfig, PlanStatus, WorkflowExecutor, WorkflowPlan, WorkflowPlanner,
    format_workflow_display,
};

/// Reply stored when a turn cannot be completed.
pub const APOLOGY_MESSAGE: &str =
    "ขอโทษครับ เกิดข้อผิดพลาดในการประมวลผลคำขอของคุณ กรุณาลองใหม่อีกครั้ง";

const WORKFLOW_FAILED: &str = "Workflow execution failed";

// ---------------------------------------------------------------------------
// SendMessageResult
// ---------------------------------------------------------------------------

/// Everything the client needs to render one chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResult {
    pub user_message: Message,
    pub assistant_message: Message,
    pub automation_triggered: bool,
    pub automation_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_status_code: Option<u16>,
    /// Id of the executed plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_tracking_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_is_temporary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_is_processing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_plan: Option<WorkflowPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_display: Option<String>,
}

/// Outcome of the workflow half of a turn.
struct WorkflowRun {
    plan: WorkflowPlan,
    display: String,
    success: bool,
}

// ---------------------------------------------------------------------------
// ChatService
// ---------------------------------------------------------------------------

pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    planner: WorkflowPlanner,
    executor: WorkflowExecutor,
    automation: Arc<dyn Automation>,
    responder: Option<Arc<dyn Responder>>,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        planner: WorkflowPlanner,
        automation: Arc<dyn Automation>,
        executor_config: ExecutorConfig,
    ) -> Self {
        let executor = WorkflowExecutor::new(Arc::clone(&automation)).with_config(executor_config);
        Self {
            store,
            planner,
            executor,
            automation,
            responder: None,
        }
    }

    /// Use `responder` for replies instead of the deterministic fallback.
    pub fn with_responder(mut self, responder: Arc<dyn Responder>) -> Self {
        self.responder = Some(responder);
        self
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn automation(&self) -> &Arc<dyn Automation> {
        &self.automation
    }

    pub fn planner(&self) -> &WorkflowPlanner {
        &self.planner
    }

    pub fn executor(&self) -> &WorkflowExecutor {
        &self.executor
    }

    /// Label of the active responder, `None` when replies use the fallback.
    pub fn responder_name(&self) -> Option<&'static str> {
        self.responder.as_ref().map(|r| r.name())
    }

    /// Create a conversation, titled `New Chat {date}` when no title is given.
    pub async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<&str>,
    ) -> StoreResult<Conversation> {
        let title = match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => t.to_owned(),
            None => default_title(),
        };
        self.store.create_conversation(user_id, &title).await
    }

    /// Run one chat turn.
    ///
    /// A store failure still yields a result: the apology is returned as the
    /// assistant message and the error is reported in `automation_error`.
    #[instrument(skip(self, content), fields(len = content.len()))]
    pub async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
        user_id: &str,
    ) -> SendMessageResult {
        match self.run_turn(conversation_id, content).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "chat turn failed");
                self.apologize(conversation_id, content, e.to_string()).await
            }
        }
    }

    /// Plan and execute `description` outside of a conversation.
    #[instrument(skip(self))]
    pub async fn trigger_manually(&self, description: &str) -> AutomationResult {
        let run = self.run_workflow(description).await;
        AutomationResult {
            success: run.success,
            message: Some(run.display.clone()),
            flow_summary: Some(run.display),
            ..AutomationResult::default()
        }
    }

    /// Plan `request` and execute the plan.
    pub async fn plan_and_execute(&self, request: &str) -> WorkflowPlan {
        self.run_workflow(request).await.plan
    }

    // -- internals -----------------------------------------------------------

    async fn run_turn(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> StoreResult<SendMessageResult> {
        let user_message = self
            .store
            .save_message(conversation_id, Role::User, content)
            .await?;
        debug!(message_id = %user_message.id, "user message saved");

        let triggered = self.planner.should_plan(content);
        let run = if triggered {
            Some(self.run_workflow(content).await)
        } else {
            None
        };

        let mut reply = self
            .reply(conversation_id, content, run.as_ref().map(|r| r.success))
            .await;
        if let Some(run) = &run
            && !run.display.is_empty()
        {
            reply.push_str("\n\n");
            reply.push_str(&run.display);
        }
        if reply.trim().is_empty() {
            reply = fallback_response(content);
        }

        let assistant_message = self
            .store
            .save_message(conversation_id, Role::Assistant, &reply)
            .await?;

        let success = run.as_ref().is_some_and(|r| r.success);
        let (plan, display) = match run {
            Some(run) => (Some(run.plan), Some(run.display)),
            None => (None, None),
        };

        Ok(SendMessageResult {
            user_message,
            assistant_message,
            automation_triggered: triggered,
            automation_success: success,
            automation_error: plan
                .as_ref()
                .filter(|p| p.status == PlanStatus::Failed)
                .map(|_| WORKFLOW_FAILED.to_owned()),
            automation_status_code: triggered.then_some(if success { 200 } else { 500 }),
            automation_tracking_id: plan.as_ref().map(|p| p.id.clone()),
            automation_is_temporary: Some(false),
            automation_is_processing: Some(false),
            workflow_plan: plan,
            workflow_display: display,
        })
    }

    async fn run_workflow(&self, request: &str) -> WorkflowRun {
        let plan = self.planner.plan(request);
        info!(workflow_id = %plan.id, steps = plan.steps.len(), "executing workflow");

        let plan = self.executor.execute(&plan).await;
        let success = plan.status == PlanStatus::Completed;
        info!(workflow_id = %plan.id, status = ?plan.status, "workflow finished");

        WorkflowRun {
            display: format_workflow_display(&plan),
            plan,
            success,
        }
    }

    /// The responder's reply, or the fallback when it is absent or fails.
    async fn reply(&self, conversation_id: &str, content: &str, workflow: Option<bool>) -> String {
        let Some(responder) = &self.responder else {
            debug!("no responder configured, using fallback reply");
            return fallback_response(content);
        };

        let history = match self.store.list_messages(conversation_id).await {
            Ok(messages) => messages.iter().map(to_chat_message).collect(),
            Err(e) => {
                warn!(error = %e, "could not load history, using fallback reply");
                return fallback_response(content);
            }
        };

        let request = ResponseRequest::new(content)
            .with_history(history)
            .with_workflow(workflow.map(WorkflowOutcome::from_success));

        match responder.respond(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    responder = responder.name(),
                    error = %e,
                    "responder failed, using fallback reply"
                );
                fallback_response(content)
            }
        }
    }

    async fn apologize(
        &self,
        conversation_id: &str,
        content: &str,
        error: String,
    ) -> SendMessageResult {
        let assistant_message = match self
            .store
            .save_message(conversation_id, Role::Assistant, APOLOGY_MESSAGE)
            .await
        {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "could not save apology");
                unsaved_message(conversation_id, Role::Assistant, APOLOGY_MESSAGE)
            }
        };

        SendMessageResult {
            user_message: unsaved_message(conversation_id, Role::User, content),
            assistant_message,
            automation_triggered: false,
            automation_success: false,
            automation_error: Some(error),
            automation_status_code: None,
            automation_tracking_id: None,
            automation_is_temporary: Some(true),
            automation_is_processing: None,
            workflow_plan: None,
            workflow_display: None,
        }
    }
}

fn to_chat_message(message: &Message) -> ChatMessage {
    match message.role {
        Role::User => ChatMessage::user(&message.content),
        Role::Assistant => ChatMessage {
            role: rolechat_agent::Role::Assistant,
            content: message.content.clone(),
        },
    }
}

fn unsaved_message(conversation_id: &str, role: Role, content: &str) -> Message {
    Message {
        id: Uuid::now_v7().to_string(),
        conversation_id: conversation_id.to_owned(),
        role,
        content: content.to_owned(),
        timestamp: Utc::now(),
    }
}

/// `New Chat M/D/YYYY`.
pub fn default_title() -> String {
    format!("New Chat {}", Utc::now().format("%-m/%-d/%Y"))
}
