//! The [`Responder`] seam and its implementations.

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::fallback::fallback_response;
use crate::llm::{ChatMessage, ChatRequest, LlmClient};
use crate::prompt::{
    DEFAULT_HISTORY_WINDOW, WorkflowOutcome, build_system_prompt, build_user_prompt,
};

/// Everything a responder needs to answer one chat turn.
#[derive(Debug, Clone, Default)]
pub struct ResponseRequest {
    /// The user's new message.
    pub content: String,
    /// Prior turns, oldest first.
    pub history: Vec<ChatMessage>,
    /// Outcome of the workflow planned for this turn, if any.
    pub workflow: Option<WorkflowOutcome>,
}

impl ResponseRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_workflow(mut self, workflow: Option<WorkflowOutcome>) -> Self {
        self.workflow = workflow;
        self
    }
}

/// Produces the assistant's free-text reply.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Short label for status reporting.
    fn name(&self) -> &'static str;

    async fn respond(&self, request: &ResponseRequest) -> Result<String>;
}

// ---------------------------------------------------------------------------
// LLM responder
// ---------------------------------------------------------------------------

/// Replies through a Chat Completions model.
#[derive(Debug, Clone)]
pub struct LlmResponder {
    client: LlmClient,
    history_window: usize,
}

impl LlmResponder {
    pub fn new(client: LlmClient) -> Self {
        Self {
            client,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// The completion request sent for `request`.
    pub fn build_request(&self, request: &ResponseRequest) -> ChatRequest {
        ChatRequest::new(vec![
            ChatMessage::system(build_system_prompt(request.workflow)),
            ChatMessage::user(build_user_prompt(
                &request.history,
                &request.content,
                self.history_window,
            )),
        ])
    }
}

#[async_trait]
impl Responder for LlmResponder {
    fn name(&self) -> &'static str {
        "llm"
    }

    #[instrument(skip_all, fields(history = request.history.len()))]
    async fn respond(&self, request: &ResponseRequest) -> Result<String> {
        let reply = self.client.chat(&self.build_request(request)).await?;
        debug!(len = reply.len(), "llm reply received");
        Ok(reply)
    }
}

// ---------------------------------------------------------------------------
// Fallback responder
// ---------------------------------------------------------------------------

/// Replies with [`fallback_response`]; never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResponder;

#[async_trait]
impl Responder for FallbackResponder {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn respond(&self, request: &ResponseRequest) -> Result<String> {
        Ok(fallback_response(&request.content))
    }
}
