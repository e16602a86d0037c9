use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// An append-only record of a governance violation.
///
/// Created by the gate, the validator, or the guardian monitor; consumed by
/// logging and alerting only, never mutated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// When the violation was observed.
    pub timestamp: DateTime<Utc>,
    /// The agent the violation was observed for.
    pub agent_id: String,
    /// Human-readable description of the violation.
    pub violation: String,
    /// Structured context (state, cycle id, error text, ...).
    pub details: Value,
}

impl Violation {
    /// Create a violation record stamped with the current time.
    pub fn new(agent_id: impl Into<String>, violation: impl Into<String>, details: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            agent_id: agent_id.into(),
            violation: violation.into(),
            details,
        }
    }
}
