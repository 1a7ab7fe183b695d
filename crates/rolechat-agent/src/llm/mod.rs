//! LLM client and wire types.

pub mod client;
pub mod types;

pub use client::{LlmClient, LlmClientConfig, parse_openai_response};
pub use types::{ChatMessage, ChatRequest, Role};
