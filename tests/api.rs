//! REST API integration tests.
//!
//! Each test builds the axum Router over a temporary sled store with stub
//! summarizer/notifier implementations, then sends requests via
//! `tower::ServiceExt`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt; // for `.oneshot()`

use tasksumma::agent::{AgentError, AgentErrorKind, Summarizer};
use tasksumma::fallback::FALLBACK_MARKER;
use tasksumma::notify::{ChatPayload, Notifier, NotifyError};
use tasksumma::pipeline::Clock;
use tasksumma::server::{create_router, AppState};
use tasksumma::{Storage, SummaryPipeline};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct StubSummarizer {
    reply: Result<String, AgentError>,
    calls: AtomicUsize,
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, _task_list: &str) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<ChatPayload>>,
    fail: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, payload: &ChatPayload) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(payload.clone());
        if self.fail {
            return Err(NotifyError::Rejected {
                status: 404,
                body: "no_service".into(),
            });
        }
        Ok(())
    }
}

struct FixedClock(DateTime<FixedOffset>);

impl Clock<FixedOffset> for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

struct Harness {
    router: axum::Router,
    summarizer: Arc<StubSummarizer>,
    notifier: Arc<RecordingNotifier>,
}

fn now() -> DateTime<FixedOffset> {
    FixedOffset::west_opt(5 * 3600)
        .unwrap()
        .with_ymd_and_hms(2026, 10, 19, 9, 0, 0)
        .unwrap()
}

fn setup_with(reply: Result<String, AgentError>, notifier: RecordingNotifier) -> Harness {
    let storage = Arc::new(Storage::temporary().expect("temporary store"));
    let summarizer = Arc::new(StubSummarizer {
        reply,
        calls: AtomicUsize::new(0),
    });
    let notifier = Arc::new(notifier);
    let clock: Arc<dyn Clock<FixedOffset>> = Arc::new(FixedClock(now()));
    let pipeline = Arc::new(SummaryPipeline::new(
        storage.clone(),
        summarizer.clone(),
        notifier.clone(),
        clock,
        "*Pending Tasks*",
    ));
    let state = Arc::new(AppState { storage, pipeline });
    Harness {
        router: create_router(state, &["http://localhost:3000".to_string()]),
        summarizer,
        notifier,
    }
}

fn setup() -> Harness {
    setup_with(Ok("All good.".into()), RecordingNotifier::default())
}

fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    match body {
        Some(val) => builder.body(Body::from(val.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
}

async fn send(router: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

async fn create(router: &axum::Router, body: Value) -> Value {
    let (status, created) = send(router, json_request(Method::POST, "/todos", Some(body))).await;
    assert_eq!(status, StatusCode::CREATED);
    created
}

fn local_midnight_plus(days: i64) -> String {
    let date = now().date_naive() + Duration::days(days);
    now()
        .timezone()
        .from_local_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
        .unwrap()
        .with_timezone(&Utc)
        .to_rfc3339()
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_endpoint_returns_banner() {
    let h = setup();
    let (status, body) = send(&h.router, json_request(Method::GET, "/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("Todo Summary Assistant API is running".into()));
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_and_fetch_todo() {
    let h = setup();
    let created = create(
        &h.router,
        json!({ "title": "Write report", "priority": "high", "dueDate": "2026-10-20", "description": "" }),
    )
    .await;

    assert_eq!(created["title"], "Write report");
    assert_eq!(created["completed"], false);
    assert_eq!(created["priority"], "high");
    assert!(created["description"].is_null());
    assert!(created["createdAt"].is_string());

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(&h.router, json_request(Method::GET, &format!("/todos/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn create_without_title_is_bad_request() {
    let h = setup();
    let (status, body) =
        send(&h.router, json_request(Method::POST, "/todos", Some(json!({ "title": "  " })))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "title is required");
}

#[tokio::test]
async fn create_with_bad_priority_is_bad_request() {
    let h = setup();
    let (status, _) = send(
        &h.router,
        json_request(Method::POST, "/todos", Some(json!({ "title": "a", "priority": "urgent" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_is_newest_first_and_filterable() {
    let h = setup();
    create(&h.router, json!({ "title": "first" })).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    create(&h.router, json!({ "title": "second", "completed": true })).await;

    let (status, all) = send(&h.router, json_request(Method::GET, "/todos", None)).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = all.as_array().unwrap().iter().map(|t| t["title"].clone()).collect();
    assert_eq!(titles, [json!("second"), json!("first")]);

    let (_, active) = send(&h.router, json_request(Method::GET, "/todos?status=active", None)).await;
    assert_eq!(active.as_array().unwrap().len(), 1);
    assert_eq!(active[0]["title"], "first");

    let (_, oldest) = send(&h.router, json_request(Method::GET, "/todos?sort=date-asc", None)).await;
    assert_eq!(oldest[0]["title"], "first");
}

#[tokio::test]
async fn unknown_list_parameters_are_bad_request() {
    let h = setup();
    create(&h.router, json!({ "title": "first" })).await;

    for uri in ["/todos?sort=bogus", "/todos?status=pending"] {
        let (status, body) = send(&h.router, json_request(Method::GET, uri, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["message"].is_string(), "{uri}: {body}");
    }
}

#[tokio::test]
async fn update_changes_only_sent_fields() {
    let h = setup();
    let created = create(&h.router, json!({ "title": "task", "priority": "low", "description": "keep" })).await;
    let id = created["id"].as_str().unwrap();

    let (status, updated) = send(
        &h.router,
        json_request(Method::PUT, &format!("/todos/{id}"), Some(json!({ "completed": true }))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["priority"], "low");
    assert_eq!(updated["description"], "keep");
    assert_eq!(updated["createdAt"], created["createdAt"]);
}

#[tokio::test]
async fn missing_todo_is_not_found() {
    let h = setup();
    for req in [
        json_request(Method::GET, "/todos/nope", None),
        json_request(Method::PUT, "/todos/nope", Some(json!({ "title": "x" }))),
        json_request(Method::DELETE, "/todos/nope", None),
    ] {
        let (status, body) = send(&h.router, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Todo not found");
    }
}

#[tokio::test]
async fn delete_removes_todo() {
    let h = setup();
    let created = create(&h.router, json!({ "title": "gone soon" })).await;
    let uri = format!("/todos/{}", created["id"].as_str().unwrap());

    let (status, body) = send(&h.router, json_request(Method::DELETE, &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Todo deleted successfully");

    let (status, _) = send(&h.router, json_request(Method::GET, &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Summarize
// ---------------------------------------------------------------------------

#[tokio::test]
async fn summarize_without_pending_todos_is_bad_request() {
    let h = setup();
    create(&h.router, json!({ "title": "done", "completed": true })).await;

    let (status, body) = send(&h.router, json_request(Method::POST, "/summarize", None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No pending todos to summarize");
    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 0);
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn summarize_returns_model_text() {
    let h = setup();
    create(&h.router, json!({ "title": "A" })).await;

    let (status, body) =
        send(&h.router, json_request(Method::POST, "/summarize", Some(json!({})))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["summary"], "All good.");
    assert_eq!(body["usedFallback"], false);
    assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn summarize_falls_back_on_quota_exhaustion() {
    let h = setup_with(
        Err(AgentError::new(AgentErrorKind::QuotaExhausted, "insufficient_quota")),
        RecordingNotifier::default(),
    );
    create(
        &h.router,
        json!({ "title": "A", "priority": "high", "dueDate": local_midnight_plus(0) }),
    )
    .await;
    create(
        &h.router,
        json!({ "title": "B", "priority": "low", "dueDate": local_midnight_plus(-1) }),
    )
    .await;

    let (status, body) = send(&h.router, json_request(Method::POST, "/summarize", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["usedFallback"], true);
    let summary = body["summary"].as_str().unwrap();
    assert!(summary.contains("Overview"));
    assert!(summary.contains("1 high priority, 0 medium priority, and 1 low priority"));
    assert!(summary.contains("*Due Today (1):*\n• A (High Priority)"));
    assert!(summary.contains("*Overdue Tasks (1):*\n• B"));
    assert!(summary.ends_with(FALLBACK_MARKER));

    let sent = h.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body, summary);
}

#[tokio::test]
async fn summarize_scopes_by_user() {
    let h = setup();
    create(&h.router, json!({ "title": "theirs", "userId": "u2" })).await;

    let (status, _) = send(
        &h.router,
        json_request(Method::POST, "/summarize", Some(json!({ "userId": "u1" }))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn summarizer_failure_is_internal_error() {
    let h = setup_with(
        Err(AgentError::new(AgentErrorKind::Timeout, "after 60s")),
        RecordingNotifier::default(),
    );
    create(&h.router, json!({ "title": "A" })).await;

    let (status, body) = send(&h.router, json_request(Method::POST, "/summarize", None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to generate summary or send to Slack");
    assert!(body["error"].as_str().unwrap().contains("after 60s"));
    assert!(body.get("summary").is_none());
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn delivery_failure_still_returns_summary() {
    let h = setup_with(
        Ok("Ship it.".into()),
        RecordingNotifier {
            fail: true,
            ..Default::default()
        },
    );
    create(&h.router, json!({ "title": "A" })).await;

    let (status, body) = send(&h.router, json_request(Method::POST, "/summarize", None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["summary"], "Ship it.");
    assert!(body["error"].as_str().unwrap().contains("404"));
    assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
}
