//! REST API route handlers.
//!
//! Endpoints for status, chat, conversation management, workflow
//! planning/execution/reconciliation, and the automation backend.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use rolechat_automation::AutomationResult;
use rolechat_store::{Conversation, ConversationPatch, Message};
use rolechat_workflow::{WorkflowPlan, normalize_plan, parse_webhook, reconcile, reconcile_value};

use crate::chat::SendMessageResult;
use crate::error::{Result, WebError};
use crate::state::AppState;

type Shared = State<Arc<AppState>>;

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(WebError::BadRequest(format!("`{field}` is required")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub storage: String,
    /// Name of the active responder; absent when replies use the fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responder: Option<String>,
    pub llm_available: bool,
}

pub async fn status(State(state): Shared) -> Json<StatusResponse> {
    let responder = state.chat.responder_name();
    Json(StatusResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        storage: state.chat.store().backend().into(),
        llm_available: responder.is_some(),
        responder: responder.map(str::to_owned),
    })
}

// ---------------------------------------------------------------------------
// POST /api/chat
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    pub conversation_id: String,
    pub content: String,
    #[serde(default)]
    pub user_id: String,
}

pub async fn chat(
    State(state): Shared,
    Json(body): Json<ChatBody>,
) -> Result<Json<SendMessageResult>> {
    require("conversationId", &body.conversation_id)?;
    require("content", &body.content)?;
    Ok(Json(
        state
            .chat
            .send_message(&body.conversation_id, &body.content, &body.user_id)
            .await,
    ))
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationBody {
    pub user_id: String,
    pub title: Option<String>,
}

/// GET /api/conversations?userId=: conversations of one user.
pub async fn list_conversations(
    State(state): Shared,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Conversation>>> {
    let user_id = query.user_id.unwrap_or_default();
    require("userId", &user_id)?;
    Ok(Json(state.chat.store().list_conversations(&user_id).await?))
}

/// POST /api/conversations: start a conversation.
pub async fn create_conversation(
    State(state): Shared,
    Json(body): Json<CreateConversationBody>,
) -> Result<(StatusCode, Json<Conversation>)> {
    require("userId", &body.user_id)?;
    let conversation = state
        .chat
        .create_conversation(&body.user_id, body.title.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// PATCH /api/conversations/{id}: rename or set the preview.
pub async fn update_conversation(
    State(state): Shared,
    Path(id): Path<String>,
    Json(patch): Json<ConversationPatch>,
) -> Result<Json<Value>> {
    if patch.is_empty() {
        return Err(WebError::BadRequest("nothing to update".into()));
    }
    state.chat.store().update_conversation(&id, patch).await?;
    Ok(Json(json!({"updated": true})))
}

/// DELETE /api/conversations/{id}: drop a conversation and its messages.
pub async fn delete_conversation(
    State(state): Shared,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    state.chat.store().delete_conversation(&id).await?;
    Ok(Json(json!({"deleted": true})))
}

/// GET /api/conversations/{id}/messages: oldest first.
pub async fn list_messages(
    State(state): Shared,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>> {
    Ok(Json(state.chat.store().list_messages(&id).await?))
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PlanBody {
    pub request: String,
}

#[derive(Debug, Deserialize)]
pub struct ReconcileBody {
    pub plan: Value,
    #[serde(default)]
    pub updates: Value,
}

#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    pub plan: Value,
    pub webhook: Value,
}

/// POST /api/workflows/plan: plan without executing.
pub async fn plan_workflow(
    State(state): Shared,
    Json(body): Json<PlanBody>,
) -> Result<Json<WorkflowPlan>> {
    require("request", &body.request)?;
    Ok(Json(state.chat.planner().plan(&body.request)))
}

/// POST /api/workflows/execute: execute a client-supplied plan.
pub async fn execute_workflow(State(state): Shared, Json(plan): Json<Value>) -> Json<WorkflowPlan> {
    let plan = normalize_plan(&plan);
    Json(state.chat.executor().execute(&plan).await)
}

/// POST /api/workflows/reconcile: fold status updates into a plan.
pub async fn reconcile_workflow(Json(body): Json<ReconcileBody>) -> Json<WorkflowPlan> {
    Json(reconcile_value(&body.plan, &body.updates))
}

/// POST /api/workflows/webhook: apply one backend callback to a plan.
pub async fn workflow_webhook(Json(body): Json<WebhookBody>) -> Result<Json<WorkflowPlan>> {
    let update = parse_webhook(&body.webhook)
        .ok_or_else(|| WebError::BadRequest("webhook needs a workflowId and status".into()))?;
    let plan = normalize_plan(&body.plan);
    Ok(Json(reconcile(&plan, &[update])))
}

// ---------------------------------------------------------------------------
// Automation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TriggerBody {
    pub description: String,
}

/// POST /api/automation/trigger: plan and execute outside a conversation.
pub async fn trigger(
    State(state): Shared,
    Json(body): Json<TriggerBody>,
) -> Result<Json<AutomationResult>> {
    require("description", &body.description)?;
    Ok(Json(state.chat.trigger_manually(&body.description).await))
}

/// POST /api/automation/test: health probe, then a marked test request.
pub async fn test_connection(State(state): Shared) -> Json<AutomationResult> {
    Json(state.chat.automation().check_connection().await)
}

/// GET /api/automation/health
pub async fn health(State(state): Shared) -> Json<AutomationResult> {
    Json(state.chat.automation().health_check().await)
}
