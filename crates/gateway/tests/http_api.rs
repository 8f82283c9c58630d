//! Drives the axum router end to end with a scripted model and an
//! in-memory checkpoint store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use tc_domain::config::Config;
use tc_domain::error::{Error, Result};
use tc_gateway::{api, bootstrap};
use tc_providers::{ChatRequest, ChatResponse, LlmProvider};
use tc_threads::{MemoryCheckpointStore, ThreadLockMap};
use tc_tools::ToolRegistry;

struct ScriptedProvider {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(&self, _req: &ChatRequest) -> Result<ChatResponse> {
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(ChatResponse {
                content: text,
                tool_calls: vec![],
                usage: None,
                model: "scripted-1".into(),
                finish_reason: Some("stop".into()),
            }),
            Some(Err(msg)) => Err(Error::Provider {
                provider: "scripted".into(),
                message: msg,
            }),
            None => Err(Error::Other("script exhausted".into())),
        }
    }
    fn provider_id(&self) -> &str {
        "scripted"
    }
    fn default_model(&self) -> &str {
        "scripted-1"
    }
}

struct Harness {
    app: Router,
    locks: Arc<ThreadLockMap>,
    _dir: tempfile::TempDir,
    archive_dir: std::path::PathBuf,
}

fn harness(replies: Vec<std::result::Result<&str, &str>>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let archive_dir = dir.path().join("chat_history");

    let mut config = Config::default();
    config.storage.archive_dir = archive_dir.clone();

    let provider = ScriptedProvider {
        replies: Mutex::new(
            replies
                .into_iter()
                .map(|r| r.map(str::to_owned).map_err(str::to_owned))
                .collect(),
        ),
    };
    let state = bootstrap::assemble(
        Arc::new(config),
        Arc::new(MemoryCheckpointStore::new()),
        Some(Arc::new(provider)),
        ToolRegistry::new(),
    );

    Harness {
        locks: state.locks.clone(),
        app: api::router().with_state(state),
        _dir: dir,
        archive_dir,
    }
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn root_is_alive() {
    let h = harness(vec![]);
    let (status, body) = call(&h.app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to ThreadChat API");
}

#[tokio::test]
async fn new_thread_writes_nothing() {
    let h = harness(vec![]);
    let (_, a) = call(&h.app, "POST", "/new_thread", None).await;
    let (_, b) = call(&h.app, "POST", "/new_thread", None).await;
    assert_eq!(a["message"], "New thread created");
    assert_ne!(a["thread_id"], b["thread_id"]);

    let (_, threads) = call(&h.app, "GET", "/threads", None).await;
    assert_eq!(threads["threads"], json!([]));
}

#[tokio::test]
async fn chat_then_history() {
    let h = harness(vec![Ok("Hi! How can I help?")]);
    let (_, created) = call(&h.app, "POST", "/new_thread", None).await;
    let tid = created["thread_id"].as_str().unwrap().to_owned();

    let (status, body) = call(
        &h.app,
        "POST",
        "/chat",
        Some(json!({ "thread_id": tid, "message": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["thread_id"], tid.as_str());
    assert_eq!(body["response"], "Hi! How can I help?");

    let (_, threads) = call(&h.app, "GET", "/threads", None).await;
    assert_eq!(threads["threads"], json!([tid]));

    let (_, history) = call(&h.app, "GET", &format!("/history/{tid}"), None).await;
    assert_eq!(
        history["history"],
        json!([
            { "role": "user", "content": "hello" },
            { "role": "assistant", "content": "Hi! How can I help?" },
        ])
    );
}

#[tokio::test]
async fn unknown_thread_history_is_empty() {
    let h = harness(vec![]);
    let (status, body) = call(&h.app, "GET", "/history/never-used", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["history"], json!([]));
}

#[tokio::test]
async fn empty_thread_id_is_a_bad_request() {
    let h = harness(vec![Ok("unused")]);
    let (status, body) = call(
        &h.app,
        "POST",
        "/chat",
        Some(json!({ "thread_id": "", "message": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("thread_id"));
}

#[tokio::test]
async fn generation_failure_is_a_500_with_detail() {
    let h = harness(vec![Err("quota exhausted")]);
    let (status, body) = call(
        &h.app,
        "POST",
        "/chat",
        Some(json!({ "thread_id": "t-1", "message": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("quota exhausted"));

    // the user message was checkpointed before the model failed
    let (_, history) = call(&h.app, "GET", "/history/t-1", None).await;
    assert_eq!(history["history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn save_chat_writes_archive() {
    let h = harness(vec![Ok("pong")]);
    call(
        &h.app,
        "POST",
        "/chat",
        Some(json!({ "thread_id": "t-1", "message": "ping" })),
    )
    .await;

    let (status, body) = call(
        &h.app,
        "POST",
        "/save_chat",
        Some(json!({ "thread_id": "t-1", "chat_name": "notes" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Chat saved as 'notes.txt'");

    let text = std::fs::read_to_string(h.archive_dir.join("notes.txt")).unwrap();
    assert_eq!(text, "user: ping\n\nassistant: pong\n\n");
}

#[tokio::test]
async fn save_chat_rejects_path_names() {
    let h = harness(vec![]);
    let (status, body) = call(
        &h.app,
        "POST",
        "/save_chat",
        Some(json!({ "thread_id": "t-1", "chat_name": "../escape" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn delete_chat_removes_checkpoints_and_archives() {
    let h = harness(vec![Ok("pong")]);
    call(
        &h.app,
        "POST",
        "/chat",
        Some(json!({ "thread_id": "t-1", "message": "ping" })),
    )
    .await;
    // archive defaults to the thread id as its name
    call(&h.app, "POST", "/save_chat", Some(json!({ "thread_id": "t-1" }))).await;
    assert!(h.archive_dir.join("t-1.txt").exists());

    let (status, body) = call(
        &h.app,
        "DELETE",
        "/delete_chat",
        Some(json!({ "thread_id": "t-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Chat t-1 deleted successfully");

    let (_, threads) = call(&h.app, "GET", "/threads", None).await;
    assert_eq!(threads["threads"], json!([]));
    let (_, history) = call(&h.app, "GET", "/history/t-1", None).await;
    assert_eq!(history["history"], json!([]));
    assert!(!h.archive_dir.join("t-1.txt").exists());

    // deleting again is a silent no-op
    let (status, _) = call(
        &h.app,
        "DELETE",
        "/delete_chat",
        Some(json!({ "thread_id": "t-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn lock_entries_do_not_outlive_requests() {
    let h = harness(vec![Ok("one"), Ok("two"), Ok("three")]);
    for tid in ["a", "b", "c"] {
        let (status, _) = call(
            &h.app,
            "POST",
            "/chat",
            Some(json!({ "thread_id": tid, "message": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    for i in 0..200 {
        call(
            &h.app,
            "DELETE",
            "/delete_chat",
            Some(json!({ "thread_id": format!("ghost-{i}") })),
        )
        .await;
    }
    assert_eq!(h.locks.thread_count(), 0);
}
