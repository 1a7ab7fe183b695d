//! Conversational responder for Role Chat.
//!
//! ## Modules
//!
//! - [`llm`] -- OpenAI-compatible Chat Completions client and wire types.
//! - [`prompt`] -- The Role persona prompt and the bounded history window.
//! - [`responder`] -- The [`Responder`] seam with LLM and fallback
//!   implementations.
//! - [`fallback`] -- Deterministic bilingual acknowledgement.
//! - [`error`] -- Agent error types.

pub mod error;
pub mod fallback;
pub mod llm;
pub mod prompt;
pub mod responder;

pub use error::{AgentError, Result};
pub use fallback::{fallback_response, is_thai};
pub use llm::{ChatMessage, ChatRequest, LlmClient, LlmClientConfig, Role};
pub use prompt::{DEFAULT_HISTORY_WINDOW, WorkflowOutcome, build_system_prompt, build_user_prompt};
pub use responder::{FallbackResponder, LlmResponder, Responder, ResponseRequest};
