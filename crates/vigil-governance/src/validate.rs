use crate::violations::{record_violation, ViolationSink};
use serde_json::json;
use std::sync::Arc;
use vigil_core::{AgentState, VigilError, VigilResult};
use vigil_store::AgentRegistry;

/// Pre-execution agent state check.
///
/// This is the second, stricter gate: unlike the transport-level
/// [`crate::StateGate`], it also blocks paused agents. It is invoked
/// immediately before a task's side effect so authorization is never based
/// on stale state.
pub struct StateValidator {
    registry: Arc<dyn AgentRegistry>,
    violations: Arc<dyn ViolationSink>,
}

impl StateValidator {
    /// Build a validator over the given registry.
    pub fn new(registry: Arc<dyn AgentRegistry>, violations: Arc<dyn ViolationSink>) -> Self {
        Self {
            registry,
            violations,
        }
    }

    /// Validate that `agent_id` is present and active.
    ///
    /// Not-found, killed, and paused each record exactly one violation and
    /// fail with the matching typed error. A registry read error also records
    /// a violation and propagates unchanged, not reclassified.
    pub async fn validate(&self, agent_id: &str) -> VigilResult<()> {
        let agent = match self.registry.get(agent_id).await {
            Ok(agent) => agent,
            Err(err) => {
                record_violation(
                    self.violations.as_ref(),
                    agent_id,
                    "Error validating agent state",
                    json!({ "error": err.to_string(), "action": "validate_agent_state" }),
                );
                return Err(err);
            }
        };

        let Some(agent) = agent else {
            record_violation(
                self.violations.as_ref(),
                agent_id,
                "Agent not found in registry",
                json!({ "action": "validate_agent_state" }),
            );
            return Err(VigilError::AgentNotFound(agent_id.to_string()));
        };

        match agent.state {
            AgentState::Killed => {
                record_violation(
                    self.violations.as_ref(),
                    agent_id,
                    "Agent is in killed state",
                    json!({ "state": "killed", "action": "validate_agent_state" }),
                );
                Err(VigilError::AgentKilled(agent_id.to_string()))
            }
            AgentState::Paused => {
                record_violation(
                    self.violations.as_ref(),
                    agent_id,
                    "Agent is in paused state",
                    json!({ "state": "paused", "action": "validate_agent_state" }),
                );
                Err(VigilError::AgentPaused(agent_id.to_string()))
            }
            AgentState::Active => Ok(()),
        }
    }
}
