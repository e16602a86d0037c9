use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware as axum_mw,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info};
use vigil_core::{NewTask, TaskKind, TaskPriority, VigilError};
use vigil_governance::{agent_id_from_headers, state_gate, ErrorBody, StateGate};
use vigil_store::TaskStore;

/// Shared application state.
pub struct AppState {
    /// The task queue submissions land in.
    pub tasks: Arc<dyn TaskStore>,
    /// The transport-boundary gate.
    pub gate: Arc<StateGate>,
}

/// Build the gateway router.
///
/// `POST /tasks` runs behind the state gate; `GET /health` does not.
pub fn build_router(state: Arc<AppState>) -> Router {
    let gate = state.gate.clone();
    Router::new()
        .route("/tasks", post(submit_task))
        .route_layer(axum_mw::from_fn_with_state(gate, state_gate))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "vigil" }))
}

/// Task submission payload. All fields optional so validation can answer
/// with a machine-readable 400 instead of a deserialization failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitTaskRequest {
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<String>,
    target_ref: Option<String>,
    priority: Option<String>,
    metadata: Option<Map<String, Value>>,
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody::new("Invalid request", message)),
    )
        .into_response()
}

async fn submit_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SubmitTaskRequest>,
) -> Response {
    let source_agent_id = agent_id_from_headers(&headers);

    let (Some(kind_raw), Some(content)) = (body.kind, body.content) else {
        return bad_request("type and content are required");
    };
    if content.is_empty() {
        return bad_request("type and content are required");
    }
    let kind = TaskKind::parse(&kind_raw);
    if kind == TaskKind::Unknown {
        return bad_request("type must be \"log\" or \"create\"");
    }
    if kind == TaskKind::Log && body.target_ref.as_deref().map_or(true, str::is_empty) {
        return bad_request("targetRef is required for log tasks");
    }

    let submission = NewTask {
        kind,
        content,
        target_ref: body.target_ref,
        source_agent_id: source_agent_id.clone(),
        priority: body
            .priority
            .as_deref()
            .map(TaskPriority::parse)
            .unwrap_or_default(),
        metadata: body.metadata.unwrap_or_default(),
    };

    match state.tasks.enqueue(submission).await {
        Ok(task_id) => {
            info!(
                source_agent_id = %source_agent_id,
                task_id = %task_id,
                kind = %kind,
                "task enqueued"
            );
            (
                StatusCode::CREATED,
                Json(json!({
                    "status": "enqueued",
                    "taskId": task_id,
                    "timestamp": Utc::now(),
                })),
            )
                .into_response()
        }
        Err(VigilError::Validation(message)) => bad_request(&message),
        Err(err) => {
            error!(
                source_agent_id = %source_agent_id,
                error = %err,
                "error enqueueing task"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(
                    "Internal server error",
                    "Unable to enqueue task",
                )),
            )
                .into_response()
        }
    }
}
