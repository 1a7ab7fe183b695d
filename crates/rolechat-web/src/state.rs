//! Shared application state for the web server.
//!
//! [`AppState`] is wrapped in an `Arc` and shared across all request
//! handlers.

use std::sync::Arc;

use crate::WebConfig;
use crate::chat::ChatService;

/// Shared state accessible from every Axum handler.
#[derive(Clone)]
pub struct AppState {
    /// Chat flow plus the store, planner, and automation it wraps.
    pub chat: Arc<ChatService>,

    /// Web server configuration.
    pub config: WebConfig,
}

impl AppState {
    pub fn new(chat: ChatService, config: WebConfig) -> Self {
        Self {
            chat: Arc::new(chat),
            config,
        }
    }
}
