use crate::alerts::AlertSink;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};
use vigil_core::{Agent, AgentState, Alert, AlertKind, Violation};
use vigil_governance::ViolationSink;
use vigil_store::AgentRegistry;

/// Aggregated outcome of one guardian sweep.
///
/// Serialized in camelCase to match the wire shape alert consumers expect.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    /// When the cycle started.
    pub timestamp: DateTime<Utc>,
    /// Correlates log lines of one sweep, e.g. `cycle-42`.
    pub cycle_id: String,
    /// Number of agents read from the registry.
    pub agents_checked: usize,
    /// Violations recorded during the cycle.
    pub violations: Vec<Violation>,
    /// Alerts raised during the cycle.
    pub alerts: Vec<Alert>,
}

impl CycleSummary {
    /// Whether the cycle produced no violations and no alerts.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty() && self.alerts.is_empty()
    }
}

/// Timer-driven monitor that audits the full agent population each cycle.
///
/// Stateless between cycles except for a monotonically increasing cycle
/// counter used to correlate log lines.
pub struct GuardianMonitor {
    registry: Arc<dyn AgentRegistry>,
    violations: Arc<dyn ViolationSink>,
    alerts: Arc<dyn AlertSink>,
    cycle: AtomicU64,
}

impl GuardianMonitor {
    /// Build a monitor over the given registry and sinks.
    pub fn new(
        registry: Arc<dyn AgentRegistry>,
        violations: Arc<dyn ViolationSink>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            registry,
            violations,
            alerts,
            cycle: AtomicU64::new(0),
        }
    }

    /// Run one full sweep of the agent registry.
    ///
    /// Killed agents produce a violation and an `agent_killed` alert. Paused
    /// agents only produce an informational log line — paused is an expected,
    /// non-alarming state at this layer. Registry read errors are logged and
    /// yield an empty summary; they never take the loop down.
    pub async fn run_cycle(&self) -> CycleSummary {
        let cycle_id = format!("cycle-{}", self.cycle.fetch_add(1, Ordering::Relaxed) + 1);
        let mut summary = CycleSummary {
            timestamp: Utc::now(),
            cycle_id: cycle_id.clone(),
            agents_checked: 0,
            violations: Vec::new(),
            alerts: Vec::new(),
        };

        let agents = match self.registry.list().await {
            Ok(agents) => agents,
            Err(err) => {
                error!(cycle_id = %cycle_id, error = %err, "error monitoring agents");
                return summary;
            }
        };

        summary.agents_checked = agents.len();
        for agent in &agents {
            self.check_agent(agent, &cycle_id, &mut summary).await;
        }

        if !summary.is_empty() {
            let serialized = serde_json::to_string(&summary).unwrap_or_default();
            info!(
                cycle_id = %summary.cycle_id,
                agents_checked = summary.agents_checked,
                violations = summary.violations.len(),
                alerts = summary.alerts.len(),
                summary = %serialized,
                "guardian cycle summary"
            );
        }

        summary
    }

    async fn check_agent(&self, agent: &Agent, cycle_id: &str, summary: &mut CycleSummary) {
        match agent.state {
            AgentState::Killed => {
                let details = json!({ "state": "killed", "cycle_id": cycle_id });
                let violation =
                    Violation::new(&agent.id, "Agent is in killed state", details.clone());
                self.violations.record(violation.clone());
                summary.violations.push(violation);

                let alert = Alert::new(AlertKind::AgentKilled, &agent.id, details);
                self.alerts.send(&alert).await;
                summary.alerts.push(alert);
            }
            AgentState::Paused => {
                info!(
                    agent_id = %agent.id,
                    state = "paused",
                    cycle_id = %cycle_id,
                    "agent paused"
                );
            }
            AgentState::Active => {}
        }
    }

    /// Start the monitor loop.
    ///
    /// The next cycle is scheduled only after the current one finishes, so
    /// cycles of the same monitor never overlap. Returns the task handle so
    /// the owner can abort it; there is no implicit auto-start.
    pub fn start(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                poll_interval_ms = interval.as_millis() as u64,
                "guardian monitor started"
            );
            loop {
                self.run_cycle().await;
                tokio::time::sleep(interval).await;
            }
        })
    }
}
