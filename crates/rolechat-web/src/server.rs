//! Main web server setup and startup.
//!
//! [`WebServer`] composes the Axum router, registers all routes, applies the
//! CORS and security-header layers, and starts the HTTP listener.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::routing::{get, patch, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::WebConfig;
use crate::api;
use crate::chat::ChatService;
use crate::error::Result;
use crate::state::AppState;

/// Origins always allowed in `connect-src`.
const BASE_CONNECT_SRC: &str = "'self' https://api.openai.com";

/// Content-Security-Policy with `extra` origins appended to `connect-src`.
pub fn content_security_policy(extra: &[String]) -> String {
    let mut connect_src = BASE_CONNECT_SRC.to_owned();
    for origin in extra.iter().filter(|o| !o.is_empty()) {
        connect_src.push(' ');
        connect_src.push_str(origin);
    }

    [
        "default-src 'self'".to_owned(),
        "script-src 'self' 'unsafe-inline'".to_owned(),
        "style-src 'self' 'unsafe-inline'".to_owned(),
        "img-src 'self' data: blob: https:".to_owned(),
        "font-src 'self' data:".to_owned(),
        format!("connect-src {connect_src}"),
        "frame-src 'none'".to_owned(),
        "object-src 'none'".to_owned(),
        "base-uri 'self'".to_owned(),
        "form-action 'self'".to_owned(),
        "frame-ancestors 'none'".to_owned(),
    ]
    .join("; ")
}

fn csp_header(config: &WebConfig) -> HeaderValue {
    let policy = content_security_policy(&config.connect_src);
    HeaderValue::from_str(&policy).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "invalid connect-src origin, using the base policy");
        HeaderValue::from_str(&content_security_policy(&[]))
            .unwrap_or_else(|_| HeaderValue::from_static("default-src 'self'"))
    })
}

/// Build the router with every route and layer registered.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    let static_header = |name: HeaderName, value: &'static str| {
        SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
    };

    Router::new()
        .route("/api/status", get(api::status))
        .route("/api/chat", post(api::chat))
        // Conversations.
        .route(
            "/api/conversations",
            get(api::list_conversations).post(api::create_conversation),
        )
        .route(
            "/api/conversations/{id}",
            patch(api::update_conversation).delete(api::delete_conversation),
        )
        .route("/api/conversations/{id}/messages", get(api::list_messages))
        // Workflows.
        .route("/api/workflows/plan", post(api::plan_workflow))
        .route("/api/workflows/execute", post(api::execute_workflow))
        .route("/api/workflows/reconcile", post(api::reconcile_workflow))
        .route("/api/workflows/webhook", post(api::workflow_webhook))
        // Automation backend.
        .route("/api/automation/trigger", post(api::trigger))
        .route("/api/automation/test", post(api::test_connection))
        .route("/api/automation/health", get(api::health))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_header(&state.config),
        ))
        .layer(static_header(header::X_FRAME_OPTIONS, "DENY"))
        .layer(static_header(header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(static_header(
            header::REFERRER_POLICY,
            "strict-origin-when-cross-origin",
        ))
        .layer(cors)
        .with_state(state)
}

/// The Role Chat web server.
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: WebConfig, chat: ChatService) -> Self {
        Self {
            state: Arc::new(AppState::new(chat, config)),
        }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.state.config.bind_addr, self.state.config.port)
    }

    /// Bind and serve until the process is stopped.
    pub async fn start(self) -> Result<()> {
        let addr = self.addr();
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!(addr = %addr, "starting web server");
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        axum::serve(listener, router(self.state)).await?;
        Ok(())
    }
}
