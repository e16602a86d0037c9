use crate::violations::{record_violation, ViolationSink};
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use vigil_core::{AgentState, VigilResult};

/// Header carrying the acting agent's identity.
pub const AGENT_ID_HEADER: &str = "x-agent-id";
/// Header carrying the caller-supplied agent state hint.
pub const AGENT_STATE_HEADER: &str = "x-agent-state";

/// Resolves the acting agent's state for an inbound request.
#[async_trait]
pub trait AgentStateResolver: Send + Sync {
    /// Resolve the state. Errors are treated as a blocked request, never
    /// propagated to the transport.
    async fn resolve(&self, headers: &HeaderMap) -> VigilResult<AgentState>;
}

/// Default resolver: reads the `x-agent-state` header hint.
///
/// A missing or unrecognised hint resolves to active — the gate is
/// deliberately permissive and only hard-stops an explicit `killed`.
pub struct HeaderStateResolver;

#[async_trait]
impl AgentStateResolver for HeaderStateResolver {
    async fn resolve(&self, headers: &HeaderMap) -> VigilResult<AgentState> {
        Ok(headers
            .get(AGENT_STATE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(AgentState::from_hint)
            .unwrap_or(AgentState::Active))
    }
}

/// Machine-readable error body returned for blocked or failed requests.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Short error label.
    pub error: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ErrorBody {
    /// Build an error body.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Outcome of a gate check.
#[derive(Debug)]
pub enum GateDecision {
    /// Let the request through.
    Allow,
    /// Refuse the request with the given status and body.
    Block {
        /// HTTP status to answer with.
        status: StatusCode,
        /// Structured error body.
        body: ErrorBody,
    },
}

/// The transport-boundary state gate.
///
/// Killed agents are a hard stop here; paused agents pass and are enforced
/// deeper by the [`crate::StateValidator`]. Resolver failures block with a
/// generic internal error — nothing ever escapes to the caller as a panic or
/// raw error.
pub struct StateGate {
    resolver: Arc<dyn AgentStateResolver>,
    violations: Arc<dyn ViolationSink>,
}

impl StateGate {
    /// Gate with the default header resolver.
    pub fn new(violations: Arc<dyn ViolationSink>) -> Self {
        Self::with_resolver(Arc::new(HeaderStateResolver), violations)
    }

    /// Gate with an injected resolver.
    pub fn with_resolver(
        resolver: Arc<dyn AgentStateResolver>,
        violations: Arc<dyn ViolationSink>,
    ) -> Self {
        Self {
            resolver,
            violations,
        }
    }

    /// Authorize a request by its headers.
    pub async fn authorize(&self, headers: &HeaderMap) -> GateDecision {
        let agent_id = agent_id_from_headers(headers);
        match self.resolver.resolve(headers).await {
            Ok(AgentState::Killed) => {
                record_violation(
                    self.violations.as_ref(),
                    &agent_id,
                    "Request blocked from killed agent",
                    json!({ "state": "killed" }),
                );
                GateDecision::Block {
                    status: StatusCode::FORBIDDEN,
                    body: ErrorBody::new(
                        "Agent is killed",
                        "Requests from killed agents are not allowed",
                    ),
                }
            }
            Ok(_) => GateDecision::Allow,
            Err(err) => {
                record_violation(
                    self.violations.as_ref(),
                    &agent_id,
                    "Error resolving agent state",
                    json!({ "error": err.to_string() }),
                );
                GateDecision::Block {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: ErrorBody::new("Internal server error", "Unable to resolve agent state"),
                }
            }
        }
    }
}

/// Extract the acting agent's id, defaulting to `"unknown"`.
pub fn agent_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(AGENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Axum middleware wrapping [`StateGate::authorize`].
pub async fn state_gate(
    State(gate): State<Arc<StateGate>>,
    request: Request,
    next: Next,
) -> Response {
    match gate.authorize(request.headers()).await {
        GateDecision::Allow => next.run(request).await,
        GateDecision::Block { status, body } => (status, Json(body)).into_response(),
    }
}
