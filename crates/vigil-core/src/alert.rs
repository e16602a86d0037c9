use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Category of an alert sent to the external monitoring endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// A killed agent was detected by the guardian monitor.
    AgentKilled,
    /// An agent submitted work this subsystem does not understand.
    AgentMisbehaving,
    /// Task processing or polling failed.
    SyncError,
    /// A non-fatal processing condition (e.g. paused agent).
    SyncWarning,
    /// Informational notice.
    SyncInfo,
}

impl AlertKind {
    /// The snake_case wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::AgentKilled => "agent_killed",
            AlertKind::AgentMisbehaving => "agent_misbehaving",
            AlertKind::SyncError => "sync_error",
            AlertKind::SyncWarning => "sync_warning",
            AlertKind::SyncInfo => "sync_info",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A diagnostic alert. Ephemeral: constructed, sent once, discarded.
///
/// Serializes to the wire shape the monitoring endpoint expects:
/// `{timestamp, type, agentId, details}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// When the alert was raised.
    pub timestamp: DateTime<Utc>,
    /// Alert category.
    #[serde(rename = "type")]
    pub kind: AlertKind,
    /// The agent the alert concerns.
    pub agent_id: String,
    /// Structured context.
    pub details: Value,
}

impl Alert {
    /// Create an alert stamped with the current time.
    pub fn new(kind: AlertKind, agent_id: impl Into<String>, details: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            agent_id: agent_id.into(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_wire_values() {
        assert_eq!(
            serde_json::to_string(&AlertKind::AgentKilled).unwrap(),
            "\"agent_killed\""
        );
        assert_eq!(
            serde_json::to_string(&AlertKind::SyncWarning).unwrap(),
            "\"sync_warning\""
        );
    }

    #[test]
    fn test_alert_body_shape() {
        let alert = Alert::new(AlertKind::SyncError, "agent-1", json!({"error": "boom"}));
        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["type"], "sync_error");
        assert_eq!(value["agentId"], "agent-1");
        assert_eq!(value["details"]["error"], "boom");
        assert!(value["timestamp"].is_string());
    }
}
