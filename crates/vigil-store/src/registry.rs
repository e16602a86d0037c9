use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use vigil_core::{Agent, AgentState, VigilResult};

/// Read-only access to the agent population.
///
/// Write access belongs to the external control plane; this subsystem never
/// mutates agent state through this trait.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Look up a single agent by id.
    async fn get(&self, id: &str) -> VigilResult<Option<Agent>>;

    /// List all agents, ordered by id ascending.
    async fn list(&self) -> VigilResult<Vec<Agent>>;
}

/// In-memory agent registry for tests and local wiring.
pub struct InMemoryAgentRegistry {
    agents: RwLock<BTreeMap<String, AgentState>>,
}

impl InMemoryAgentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert or overwrite an agent row (control-plane stand-in).
    pub async fn put(&self, id: impl Into<String>, state: AgentState) {
        self.agents.write().await.insert(id.into(), state);
    }
}

impl Default for InMemoryAgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentRegistry for InMemoryAgentRegistry {
    async fn get(&self, id: &str) -> VigilResult<Option<Agent>> {
        let agents = self.agents.read().await;
        Ok(agents.get(id).map(|state| Agent {
            id: id.to_string(),
            state: *state,
        }))
    }

    async fn list(&self) -> VigilResult<Vec<Agent>> {
        let agents = self.agents.read().await;
        // BTreeMap iteration is already ordered by id.
        Ok(agents
            .iter()
            .map(|(id, state)| Agent {
                id: id.clone(),
                state: *state,
            })
            .collect())
    }
}
