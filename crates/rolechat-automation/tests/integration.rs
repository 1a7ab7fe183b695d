//! Integration tests for the rolechat-automation crate.
//!
//! Each test binds a scripted axum server on an OS-assigned port and points a
//! real [`AutomationClient`] at it, counting how many attempts arrive.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::RawQuery;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use rolechat_automation::{Automation, AutomationClient, AutomationConfig, RetryPolicy};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Start `app` on 127.0.0.1:0 and return the trigger URL.
async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind to port 0");
    let addr: SocketAddr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    format!("http://127.0.0.1:{}/hook?sig=secret", addr.port())
}

fn fast_client(url: &str) -> AutomationClient {
    let config = AutomationConfig::new(url)
        .with_timeout(Duration::from_secs(2))
        .with_retry(RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(10),
            max_retry_after: Duration::from_millis(50),
        });
    AutomationClient::new(config).expect("valid config")
}

/// A server whose trigger route answers with `script(attempt)`.
async fn scripted<F>(script: F) -> (String, Arc<AtomicU32>)
where
    F: Fn(u32) -> Response + Clone + Send + Sync + 'static,
{
    let hits = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&hits);
    let app = Router::new().route(
        "/hook",
        post(move || {
            let counter = Arc::clone(&counter);
            let script = script.clone();
            async move {
                let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                script(attempt)
            }
        }),
    );
    (serve(app).await, hits)
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sends_expected_body_and_headers() {
    let seen: Arc<Mutex<Option<(HeaderMap, Value)>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let app = Router::new().route(
        "/hook",
        post(move |headers: HeaderMap, axum::Json(body): axum::Json<Value>| {
            let sink = Arc::clone(&sink);
            async move {
                *sink.lock().await = Some((headers, body));
                axum::Json(json!([]))
            }
        }),
    );
    let url = serve(app).await;

    let result = fast_client(&url).trigger("สร้างการประชุม", false).await;
    assert!(result.success);

    let (headers, body) = seen.lock().await.take().expect("request captured");
    assert_eq!(body["description"], "สร้างการประชุม");
    assert_eq!(body["source"], "Role-Chat-Interface");
    assert_eq!(body["isTest"], false);
    assert!(body["timestamp"].is_string());
    assert_eq!(headers["user-agent"], "Role-Chat-Interface/1.0");
    assert_eq!(headers["cache-control"], "no-cache");
    assert_eq!(headers["accept"], "application/json");
}

#[tokio::test]
async fn long_descriptions_are_truncated() {
    let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let app = Router::new().route(
        "/hook",
        post(move |axum::Json(body): axum::Json<Value>| {
            let sink = Arc::clone(&sink);
            async move {
                *sink.lock().await = Some(body);
                StatusCode::OK
            }
        }),
    );
    let url = serve(app).await;

    let long = "x".repeat(2000);
    let result = fast_client(&url).trigger(&long, false).await;
    assert!(result.success);

    let body = seen.lock().await.take().expect("request captured");
    let sent = body["description"].as_str().unwrap();
    assert_eq!(sent.chars().count(), 1503);
    assert!(sent.ends_with("..."));
}

#[tokio::test]
async fn bad_gateway_is_retried_then_succeeds() {
    let (url, hits) = scripted(|attempt| {
        if attempt == 1 {
            StatusCode::BAD_GATEWAY.into_response()
        } else {
            axum::Json(json!({"tasks": [
                {"task_type": "send_email", "action_details": "{\"recipients\":[\"a@b.com\"]}", "result": "", "status": "success"}
            ]}))
            .into_response()
        }
    })
    .await;

    let result = fast_client(&url).trigger("ส่ง email", false).await;
    assert!(result.success);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(result.tasks.as_ref().map(Vec::len), Some(1));
    assert!(result.flow_summary.unwrap().contains("สำเร็จ 1/1"));
}

#[tokio::test]
async fn temporary_failure_exhausts_attempts() {
    let (url, hits) = scripted(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({"error": {"code": "WorkflowRunInProgress", "message": "busy", "trackingId": "trk-9"}})),
        )
            .into_response()
    })
    .await;

    let result = fast_client(&url).trigger("post to team", false).await;
    assert!(!result.success);
    assert!(result.is_temporary());
    assert_eq!(result.status_code, Some(500));
    assert_eq!(result.tracking_id.as_deref(), Some("trk-9"));
    assert_eq!(result.error.as_deref(), Some("Another workflow run is in progress"));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn no_response_code_becomes_processing_success() {
    let (url, hits) = scripted(|_| {
        (
            StatusCode::BAD_GATEWAY,
            axum::Json(json!({"error": {"code": "NoResponse", "message": "no response", "trackingId": "trk-1"}})),
        )
            .into_response()
    })
    .await;

    let result = fast_client(&url).trigger("meeting at 9", false).await;
    assert!(result.success);
    assert!(result.is_processing());
    assert_eq!(result.status_code, Some(502));
    assert_eq!(result.tracking_id.as_deref(), Some("trk-1"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let (url, hits) = scripted(|_| StatusCode::NOT_FOUND.into_response()).await;

    let result = fast_client(&url).trigger("notify team", false).await;
    assert!(!result.success);
    assert!(!result.is_temporary());
    assert_eq!(result.error.as_deref(), Some("Client error"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rate_limit_honours_retry_after() {
    let (url, hits) = scripted(|attempt| {
        if attempt == 1 {
            (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "0")]).into_response()
        } else {
            StatusCode::OK.into_response()
        }
    })
    .await;

    let result = fast_client(&url).trigger("schedule", false).await;
    assert!(result.success);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rate_limit_on_last_attempt_is_reported() {
    let (url, _hits) =
        scripted(|_| (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "7")]).into_response()).await;

    let result = fast_client(&url).trigger("schedule", false).await;
    assert!(!result.success);
    assert_eq!(result.retry_after, Some(7));
    assert_eq!(result.status_code, Some(429));
    assert!(result.is_temporary());
}

#[tokio::test]
async fn test_calls_use_a_single_attempt() {
    let (url, hits) = scripted(|_| StatusCode::SERVICE_UNAVAILABLE.into_response()).await;

    let result = fast_client(&url).test_connection().await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Server error"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn timeouts_are_retried_and_reported_as_temporary() {
    let slow_hits = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&slow_hits);
    let app = Router::new().route(
        "/hook",
        post(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(500)).await;
                StatusCode::OK
            }
        }),
    );
    let url = serve(app).await;

    let config = AutomationConfig::new(&url)
        .with_timeout(Duration::from_millis(100))
        .with_retry(RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(10),
            max_retry_after: Duration::from_millis(10),
        });
    let client = AutomationClient::new(config).unwrap();

    let result = client.trigger("slow request", false).await;
    assert!(!result.success);
    assert!(result.is_temporary());
    assert!(result.error.unwrap().contains("timed out"));
    assert_eq!(slow_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn truncated_success_body_is_still_success() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind to port 0");
    let port = listener.local_addr().expect("get local addr").port();
    let hits = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            read_request(&mut socket).await;
            // Promise 100 bytes, send five, hang up.
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n[{\"ta")
                .await
                .ok();
            socket.shutdown().await.ok();
        }
    });

    let client = fast_client(&format!("http://127.0.0.1:{port}/hook"));
    let result = client.trigger("send email", false).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.status_code, Some(200));
    assert_eq!(result.tasks.as_deref().map(<[_]>::len), Some(0));
    assert!(result.flow_summary.is_some());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

/// Read one HTTP request (headers plus `Content-Length` body) off `socket`.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else { return };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return;
            }
        }
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_temporary_failure() {
    // Port 9 (discard) is essentially never listening on loopback.
    let client = fast_client("http://127.0.0.1:9/hook");
    let result = client.trigger("anything", false).await;
    assert!(!result.success);
    assert!(result.is_temporary());
    assert!(result.error.is_some());
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_uses_head_without_query() {
    let query_seen: Arc<Mutex<Option<Option<String>>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&query_seen);
    let app = Router::new().route(
        "/hook",
        post(|| async { StatusCode::OK }).head(move |RawQuery(query): RawQuery| {
            let sink = Arc::clone(&sink);
            async move {
                *sink.lock().await = Some(query);
                StatusCode::METHOD_NOT_ALLOWED
            }
        }),
    );
    let url = serve(app).await;

    let result = fast_client(&url).health_check().await;
    assert!(result.success);
    assert_eq!(result.status_code, Some(405));
    assert_eq!(query_seen.lock().await.take(), Some(None));
}

#[tokio::test]
async fn check_connection_short_circuits_on_unhealthy_backend() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&hits);
    let app = Router::new().route(
        "/hook",
        post(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::OK
            }
        })
        .head(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let url = serve(app).await;

    let result = fast_client(&url).check_connection().await;
    assert!(!result.success);
    assert_eq!(result.status_code, Some(503));
    assert!(result.error.unwrap().starts_with("Health check failed"));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn check_connection_runs_test_trigger_when_healthy() {
    let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let app = Router::new().route(
        "/hook",
        post(move |axum::Json(body): axum::Json<Value>| {
            let sink = Arc::clone(&sink);
            async move {
                *sink.lock().await = Some(body);
                StatusCode::OK
            }
        })
        .head(|| async { StatusCode::OK }),
    );
    let url = serve(app).await;

    let result = fast_client(&url).check_connection().await;
    assert!(result.success);
    assert_eq!(result.message.as_deref(), Some("Test connection successful"));

    let body = seen.lock().await.take().expect("test trigger sent");
    assert_eq!(body["isTest"], true);
    assert!(
        body["description"]
            .as_str()
            .unwrap()
            .starts_with("Connection test from Role Chat Interface - ")
    );
}
