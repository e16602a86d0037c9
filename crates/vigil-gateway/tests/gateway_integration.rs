#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Gateway behavior over a real HTTP server.

use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;
use vigil_core::TaskStatus;
use vigil_gateway::{build_router, AppState};
use vigil_governance::{MemoryViolationSink, StateGate};
use vigil_store::InMemoryTaskStore;

struct TestServer {
    base_url: String,
    tasks: Arc<InMemoryTaskStore>,
    violations: Arc<MemoryViolationSink>,
}

async fn start_test_server() -> TestServer {
    let tasks = Arc::new(InMemoryTaskStore::new());
    let violations = Arc::new(MemoryViolationSink::new());
    let gate = Arc::new(StateGate::new(violations.clone()));
    let app = build_router(Arc::new(AppState {
        tasks: tasks.clone(),
        gate,
    }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Small yield to let the server task start
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    TestServer {
        base_url: format!("http://127.0.0.1:{}", addr.port()),
        tasks,
        violations,
    }
}

#[tokio::test]
async fn test_health() {
    let server = start_test_server().await;
    let body: Value = reqwest::get(format!("{}/health", server.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "vigil");
}

#[tokio::test]
async fn test_valid_submission_enqueues_pending_task() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/tasks", server.base_url))
        .header("x-agent-id", "agent-1")
        .json(&json!({
            "type": "log",
            "content": "an entry",
            "targetRef": "page-3",
            "priority": "high",
            "metadata": { "origin": "test" }
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "enqueued");
    let task_id: Uuid = body["taskId"].as_str().unwrap().parse().unwrap();

    let task = server.tasks.get(task_id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.source_agent_id, "agent-1");
    assert_eq!(task.target_ref.as_deref(), Some("page-3"));
    assert_eq!(task.metadata["origin"], "test");
}

#[tokio::test]
async fn test_killed_agent_is_blocked_and_nothing_enqueued() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/tasks", server.base_url))
        .header("x-agent-id", "agent-1")
        .header("x-agent-state", "killed")
        .json(&json!({ "type": "create", "content": "x" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Agent is killed");

    assert!(server.tasks.is_empty().await);
    assert_eq!(server.violations.len(), 1);
}

#[tokio::test]
async fn test_paused_agent_may_submit() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/tasks", server.base_url))
        .header("x-agent-id", "agent-1")
        .header("x-agent-state", "paused")
        .json(&json!({ "type": "create", "content": "x" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    assert_eq!(server.tasks.len().await, 1);
}

#[tokio::test]
async fn test_validation_errors_return_400() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    // Missing content.
    let response = client
        .post(format!("{}/tasks", server.base_url))
        .json(&json!({ "type": "create" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Unrecognised type.
    let response = client
        .post(format!("{}/tasks", server.base_url))
        .json(&json!({ "type": "archive", "content": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "type must be \"log\" or \"create\"");

    // Log without a target.
    let response = client
        .post(format!("{}/tasks", server.base_url))
        .json(&json!({ "type": "log", "content": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "targetRef is required for log tasks");

    assert!(server.tasks.is_empty().await);
}

#[tokio::test]
async fn test_health_reachable_without_gate() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", server.base_url))
        .header("x-agent-state", "killed")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}
