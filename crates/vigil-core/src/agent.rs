use serde::{Deserialize, Serialize};

/// Lifecycle state of an agent.
///
/// The state is owned and mutated by an external control plane; this
/// subsystem only reads it. Every check re-reads the current state so that
/// actions are never authorized against stale data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    /// The agent may act freely.
    Active,
    /// The agent may pass the transport gate but must not execute tasks.
    Paused,
    /// The agent is blocked everywhere.
    Killed,
}

impl AgentState {
    /// Parse a caller-supplied state hint.
    ///
    /// Unrecognised or empty input maps to [`AgentState::Active`] — the
    /// transport boundary is deliberately permissive and only reacts to an
    /// explicit `killed` (or `paused`) value.
    pub fn from_hint(hint: &str) -> Self {
        match hint {
            "killed" => AgentState::Killed,
            "paused" => AgentState::Paused,
            _ => AgentState::Active,
        }
    }

    /// Strictly parse a state name, rejecting anything unrecognised.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(AgentState::Active),
            "paused" => Some(AgentState::Paused),
            "killed" => Some(AgentState::Killed),
            _ => None,
        }
    }

    /// The lowercase wire name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::Active => "active",
            AgentState::Paused => "paused",
            AgentState::Killed => "killed",
        }
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An agent row as read from the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Registry identifier of the agent.
    pub id: String,
    /// Current lifecycle state.
    pub state: AgentState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hint_recognised_values() {
        assert_eq!(AgentState::from_hint("killed"), AgentState::Killed);
        assert_eq!(AgentState::from_hint("paused"), AgentState::Paused);
        assert_eq!(AgentState::from_hint("active"), AgentState::Active);
    }

    #[test]
    fn test_from_hint_defaults_to_active() {
        assert_eq!(AgentState::from_hint(""), AgentState::Active);
        assert_eq!(AgentState::from_hint("zombie"), AgentState::Active);
        assert_eq!(AgentState::from_hint("KILLED"), AgentState::Active);
    }

    #[test]
    fn test_strict_parse() {
        assert_eq!(AgentState::parse("paused"), Some(AgentState::Paused));
        assert_eq!(AgentState::parse("zombie"), None);
    }

    #[test]
    fn test_serde_wire_values() {
        let json = serde_json::to_string(&AgentState::Killed).unwrap();
        assert_eq!(json, "\"killed\"");
        let state: AgentState = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(state, AgentState::Paused);
    }
}
