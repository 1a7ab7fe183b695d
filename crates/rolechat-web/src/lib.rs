//! Web interface for Role Chat.
//!
//! This crate provides the chat turn and an HTTP server exposing it:
//!
//! - [`chat::ChatService`]: persist a message, plan and execute a workflow
//!   when the message asks for one, and reply.
//! - A REST API for conversations, workflows, and the automation backend.
//! - Security headers and CORS on every response.

pub mod api;
pub mod chat;
pub mod error;
pub mod server;
pub mod state;

pub use chat::{ChatService, SendMessageResult};
pub use error::{Result, WebError};
pub use server::{WebServer, content_security_policy, router};
pub use state::AppState;

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
    /// Extra origins allowed in the CSP `connect-src` directive.
    pub connect_src: Vec<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 3000,
            connect_src: Vec::new(),
        }
    }
}
