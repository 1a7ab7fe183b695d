//! Integration tests for the rolechat-web crate.
//!
//! The full router is served on an OS-assigned port with an in-memory store,
//! an in-process automation fake, and an optional scripted responder.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use rolechat_agent::{AgentError, Responder, ResponseRequest, WorkflowOutcome};
use rolechat_automation::{Automation, AutomationResult};
use rolechat_store::MemoryConversationStore;
use rolechat_web::{ChatService, WebConfig, WebServer};
use rolechat_workflow::{ExecutorConfig, WorkflowPlanner};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Succeeds unless the description starts with `fail_prefix`.
#[derive(Default)]
struct FakeAutomation {
    fail_prefix: Option<&'static str>,
    triggers: AtomicU32,
}

#[async_trait]
impl Automation for FakeAutomation {
    async fn trigger(&self, description: &str, _is_test: bool) -> AutomationResult {
        self.triggers.fetch_add(1, Ordering::SeqCst);
        if self.fail_prefix.is_some_and(|p| description.starts_with(p)) {
            return AutomationResult::failed("Trigger not found", false).with_status(404);
        }
        AutomationResult::succeeded("Automation workflow triggered successfully").with_status(200)
    }

    async fn health_check(&self) -> AutomationResult {
        AutomationResult::succeeded("Health check passed").with_status(200)
    }
}

/// Echoes what it was asked, or fails when `fail` is set.
struct EchoResponder {
    fail: bool,
}

#[async_trait]
impl Responder for EchoResponder {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn respond(&self, request: &ResponseRequest) -> rolechat_agent::Result<String> {
        if self.fail {
            return Err(AgentError::LlmRequestFailed {
                reason: "offline".into(),
            });
        }
        let note = match request.workflow {
            Some(WorkflowOutcome::Succeeded) => "workflow ok",
            Some(WorkflowOutcome::HadIssues) => "workflow issues",
            None => "no workflow",
        };
        Ok(format!("echo[{}]: {note}", request.history.len()))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct TestApp {
    base: String,
    http: reqwest::Client,
    automation: Arc<FakeAutomation>,
}

async fn spawn(automation: FakeAutomation, responder: Option<EchoResponder>) -> TestApp {
    let automation = Arc::new(automation);
    let mut chat = ChatService::new(
        Arc::new(MemoryConversationStore::new()),
        WorkflowPlanner::new().expect("planner builds"),
        automation.clone(),
        ExecutorConfig {
            step_delay: Duration::ZERO,
        },
    );
    if let Some(responder) = responder {
        chat = chat.with_responder(Arc::new(responder));
    }

    let config = WebConfig {
        connect_src: vec!["https://flows.example.com".into()],
        ..WebConfig::default()
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind to port 0");
    let addr: SocketAddr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        WebServer::new(config, chat).serve(listener).await.ok();
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    TestApp {
        base: format!("http://{addr}"),
        http: reqwest::Client::new(),
        automation,
    }
}

impl TestApp {
    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self
            .http
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .http
            .request(method, format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        self.send(reqwest::Method::POST, path, body).await
    }
}

// ---------------------------------------------------------------------------
// Status & headers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_reports_backend_and_responder() {
    let app = spawn(FakeAutomation::default(), None).await;
    let (code, body) = app.get("/api/status").await;
    assert_eq!(code, 200);
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["llmAvailable"], false);
    assert!(body.get("responder").is_none());

    let app = spawn(FakeAutomation::default(), Some(EchoResponder { fail: false })).await;
    let (_, body) = app.get("/api/status").await;
    assert_eq!(body["responder"], "echo");
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let app = spawn(FakeAutomation::default(), None).await;
    let resp = app
        .http
        .get(format!("{}/api/status", app.base))
        .send()
        .await
        .unwrap();
    let headers = resp.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    let csp = headers["content-security-policy"].to_str().unwrap();
    assert!(csp.contains("https://flows.example.com"));
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn conversation_lifecycle() {
    let app = spawn(FakeAutomation::default(), None).await;

    let (code, created) = app
        .post("/api/conversations", json!({"userId": "u1"}))
        .await;
    assert_eq!(code, 201);
    assert!(created["title"].as_str().unwrap().starts_with("New Chat "));
    let id = created["id"].as_str().unwrap().to_owned();

    let (code, _) = app
        .send(
            reqwest::Method::PATCH,
            &format!("/api/conversations/{id}"),
            json!({"title": "Renamed"}),
        )
        .await;
    assert_eq!(code, 200);

    let (_, list) = app.get("/api/conversations?userId=u1").await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["title"], "Renamed");

    let (code, _) = app
        .send(reqwest::Method::DELETE, &format!("/api/conversations/{id}"), json!({}))
        .await;
    assert_eq!(code, 200);
    let (_, list) = app.get("/api/conversations?userId=u1").await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_user_id_is_rejected() {
    let app = spawn(FakeAutomation::default(), None).await;
    let (code, body) = app.get("/api/conversations").await;
    assert_eq!(code, 400);
    assert!(body["error"].as_str().unwrap().contains("userId"));
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chat_plans_and_executes_workflow() {
    let app = spawn(FakeAutomation::default(), None).await;
    let (code, result) = app
        .post(
            "/api/chat",
            json!({
                "conversationId": "c1",
                "content": "สร้างประชุมทีมพรุ่งนี้ 9 โมง แล้วส่ง email ให้ a@b.com",
                "userId": "u1"
            }),
        )
        .await;
    assert_eq!(code, 200);
    assert_eq!(result["automationTriggered"], true);
    assert_eq!(result["automationSuccess"], true);
    assert_eq!(result["automationStatusCode"], 200);
    assert_eq!(result["workflowPlan"]["status"], "completed");
    assert_eq!(result["workflowPlan"]["steps"].as_array().unwrap().len(), 3);
    assert_eq!(result["automationTrackingId"], result["workflowPlan"]["id"]);
    assert_eq!(app.automation.triggers.load(Ordering::SeqCst), 3);

    let reply = result["assistantMessage"]["content"].as_str().unwrap();
    assert!(reply.starts_with("ขอบคุณสำหรับข้อความของคุณ"));
    assert!(reply.contains(result["workflowDisplay"].as_str().unwrap()));

    let (_, messages) = app.get("/api/conversations/c1/messages").await;
    let roles: Vec<&str> = messages
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, ["user", "assistant"]);
}

#[tokio::test]
async fn failed_high_priority_step_reports_failure() {
    let automation = FakeAutomation {
        fail_prefix: Some("สร้างการประชุม"),
        ..FakeAutomation::default()
    };
    let app = spawn(automation, Some(EchoResponder { fail: false })).await;
    let (_, result) = app
        .post(
            "/api/chat",
            json!({"conversationId": "c1", "content": "meeting tomorrow", "userId": "u1"}),
        )
        .await;

    assert_eq!(result["automationTriggered"], true);
    assert_eq!(result["automationSuccess"], false);
    assert_eq!(result["automationStatusCode"], 500);
    assert_eq!(result["automationError"], "Workflow execution failed");
    let reply = result["assistantMessage"]["content"].as_str().unwrap();
    assert!(reply.starts_with("echo[1]: workflow issues"));
}

#[tokio::test]
async fn responder_failure_uses_fallback() {
    let app = spawn(FakeAutomation::default(), Some(EchoResponder { fail: true })).await;
    let (_, result) = app
        .post(
            "/api/chat",
            json!({"conversationId": "c1", "content": "hello", "userId": "u1"}),
        )
        .await;
    assert_eq!(result["automationTriggered"], false);
    assert_eq!(
        result["assistantMessage"]["content"],
        "Thank you for your message. I have received your information."
    );
}

#[tokio::test]
async fn empty_chat_content_is_rejected() {
    let app = spawn(FakeAutomation::default(), None).await;
    let (code, _) = app
        .post("/api/chat", json!({"conversationId": "c1", "content": "  "}))
        .await;
    assert_eq!(code, 400);
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn plan_execute_and_reconcile() {
    let app = spawn(FakeAutomation::default(), None).await;

    let (code, plan) = app
        .post("/api/workflows/plan", json!({"request": "post to team this afternoon"}))
        .await;
    assert_eq!(code, 200);
    assert_eq!(plan["status"], "planning");
    assert_eq!(app.automation.triggers.load(Ordering::SeqCst), 0);

    let step_id = plan["steps"][0]["id"].as_str().unwrap().to_owned();
    let (_, reconciled) = app
        .post(
            "/api/workflows/reconcile",
            json!({
                "plan": plan,
                "updates": [{"workflowId": plan["id"], "stepId": step_id, "status": "step_completed"}]
            }),
        )
        .await;
    assert_eq!(reconciled["steps"][0]["status"], "completed");
    assert_eq!(reconciled["progress"]["completed"], 1);

    let (_, executed) = app.post("/api/workflows/execute", plan.clone()).await;
    assert_eq!(executed["status"], "completed");
    assert_eq!(executed["progress"]["percentage"], 100);
}

#[tokio::test]
async fn webhook_requires_workflow_id() {
    let app = spawn(FakeAutomation::default(), None).await;
    let (_, plan) = app
        .post("/api/workflows/plan", json!({"request": "meeting at 10:00"}))
        .await;

    let (code, _) = app
        .post(
            "/api/workflows/webhook",
            json!({"plan": plan, "webhook": {"status": "workflow_completed"}}),
        )
        .await;
    assert_eq!(code, 400);

    let (code, updated) = app
        .post(
            "/api/workflows/webhook",
            json!({"plan": plan, "webhook": {"workflowId": plan["id"], "status": "workflow_completed"}}),
        )
        .await;
    assert_eq!(code, 200);
    assert_eq!(updated["status"], "completed");
}

// ---------------------------------------------------------------------------
// Automation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn manual_trigger_and_connection_checks() {
    let app = spawn(FakeAutomation::default(), None).await;

    let (_, result) = app
        .post("/api/automation/trigger", json!({"description": "send email to a@b.com"}))
        .await;
    assert_eq!(result["success"], true);
    assert_eq!(result["message"], result["flowSummary"]);

    let (code, _) = app
        .post("/api/automation/trigger", json!({"description": ""}))
        .await;
    assert_eq!(code, 400);

    let (_, health) = app.get("/api/automation/health").await;
    assert_eq!(health["statusCode"], 200);

    let before = app.automation.triggers.load(Ordering::SeqCst);
    let (_, test) = app.post("/api/automation/test", json!({})).await;
    assert_eq!(test["success"], true);
    assert_eq!(app.automation.triggers.load(Ordering::SeqCst), before + 1);
}
