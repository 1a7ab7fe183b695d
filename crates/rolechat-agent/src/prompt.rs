//! Prompt construction for the Role assistant.

use crate::llm::types::{ChatMessage, Role};

/// Turns of history included in the user prompt.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

const SYSTEM_PROMPT: &str = "You are Role, an intelligent AI assistant that acts as a Generative Agent with workflow planning capabilities.

When users request tasks involving meetings, emails, posts, or scheduling, you:
1. Analyze the request to identify actionable items
2. Create a structured workflow plan with dependencies
3. Execute the workflow step by step
4. Provide detailed progress updates

You can break down complex requests into manageable steps and execute them systematically.

Respond concisely and helpfully in the same language as the user. Support Thai language naturally.";

const WORKFLOW_SUCCEEDED_NOTE: &str = "Note: A workflow was successfully planned and executed for this request. The user's tasks have been processed systematically.";

const WORKFLOW_ISSUES_NOTE: &str =
    "Note: A workflow was planned but encountered some issues during execution.";

/// How the workflow planned for the current turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Succeeded,
    HadIssues,
}

impl WorkflowOutcome {
    pub fn from_success(success: bool) -> Self {
        if success {
            Self::Succeeded
        } else {
            Self::HadIssues
        }
    }
}

/// The persona prompt, with a note when a workflow ran this turn.
pub fn build_system_prompt(workflow: Option<WorkflowOutcome>) -> String {
    let mut prompt = SYSTEM_PROMPT.to_owned();
    match workflow {
        Some(WorkflowOutcome::Succeeded) => {
            prompt.push_str("\n\n");
            prompt.push_str(WORKFLOW_SUCCEEDED_NOTE);
        }
        Some(WorkflowOutcome::HadIssues) => {
            prompt.push_str("\n\n");
            prompt.push_str(WORKFLOW_ISSUES_NOTE);
        }
        None => {}
    }
    prompt
}

/// The user prompt: the last `window` turns of `history`, then `content`.
pub fn build_user_prompt(history: &[ChatMessage], content: &str, window: usize) -> String {
    let start = history.len().saturating_sub(window);
    let context = history[start..]
        .iter()
        .map(|msg| {
            let who = match msg.role {
                Role::User => "User",
                _ => "Assistant",
            };
            format!("{who}: {}", msg.content)
        })
        .collect::<Vec<_>>()
        .join("\n");

    if context.is_empty() {
        format!("User: {content}")
    } else {
        format!("Previous conversation:\n{context}\n\nUser: {content}")
    }
}
