//! Shared helper functions used across CLI subcommands.
//!
//! Tracing initialization and construction of the runtime components from
//! an [`AppConfig`].

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rolechat_agent::{LlmClient, LlmResponder};
use rolechat_automation::{Automation, AutomationClient};
use rolechat_store::FallbackConversationStore;
use rolechat_web::ChatService;
use rolechat_workflow::{WorkflowExecutor, WorkflowPlanner};

use crate::config::AppConfig;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber.  `RUST_LOG` overrides `default_level`.
pub fn init_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

pub fn build_automation(config: &AppConfig) -> Result<AutomationClient> {
    AutomationClient::new(config.automation_config()?).context("failed to build automation client")
}

pub fn build_planner() -> Result<WorkflowPlanner> {
    WorkflowPlanner::new().context("failed to build request analyzer")
}

pub fn build_executor(config: &AppConfig, automation: Arc<dyn Automation>) -> WorkflowExecutor {
    WorkflowExecutor::new(automation).with_config(config.executor_config())
}

/// The full chat flow: store, planner, automation, and responder when an
/// API key is configured.
pub async fn build_chat_service(
    config: &AppConfig,
    automation: Arc<dyn Automation>,
) -> Result<ChatService> {
    let store =
        FallbackConversationStore::open(config.storage.backend, config.storage.path.clone()).await;

    let mut chat = ChatService::new(
        Arc::new(store),
        build_planner()?,
        automation,
        config.executor_config(),
    );

    match config.llm_config() {
        Some(llm) => {
            let model = llm.default_model.clone();
            let client = LlmClient::new(llm).context("failed to build LLM client")?;
            let responder =
                LlmResponder::new(client).with_history_window(config.llm.history_window);
            chat = chat.with_responder(Arc::new(responder));
            info!(%model, "LLM responder enabled");
        }
        None => info!("OPENAI_API_KEY not set, using fallback replies"),
    }

    Ok(chat)
}

/// Pretty JSON for terminal output.
pub fn pretty<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize output")
}
