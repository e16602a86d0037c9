use crate::handler::PageService;
use serde_json::json;
use std::sync::Arc;
use vigil_core::{Alert, AlertKind, Task, TaskKind, VigilError, VigilResult};
use vigil_governance::StateValidator;
use vigil_guardian::{alert_error, alert_warning, AlertSink};

/// Processes a single task under governance.
///
/// The submitting agent's state is re-validated immediately before the side
/// effect. Failures are reported to the alert sink before the error is
/// returned to the consumer loop, which then records the task as failed.
pub struct TaskProcessor {
    validator: StateValidator,
    pages: Arc<dyn PageService>,
    alerts: Arc<dyn AlertSink>,
}

impl TaskProcessor {
    /// Build a processor from its collaborators.
    pub fn new(
        validator: StateValidator,
        pages: Arc<dyn PageService>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            validator,
            pages,
            alerts,
        }
    }

    /// Process one task end to end.
    pub async fn process(&self, task: &Task) -> VigilResult<()> {
        match self.run(task).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.report(task, &err).await;
                Err(err)
            }
        }
    }

    async fn run(&self, task: &Task) -> VigilResult<()> {
        self.validator.validate(&task.source_agent_id).await?;

        match task.kind {
            TaskKind::Log => {
                let target = task
                    .target_ref
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        VigilError::TaskProcessing("targetRef is required for log tasks".into())
                    })?;
                self.pages
                    .append_entry(&task.source_agent_id, target, &task.content)
                    .await
            }
            TaskKind::Create => self
                .pages
                .create_page(&task.source_agent_id, &task.content)
                .await
                .map(|_| ()),
            TaskKind::Unknown => {
                // A kind this subsystem does not understand is misbehavior,
                // not a transient failure.
                let alert = Alert::new(
                    AlertKind::AgentMisbehaving,
                    &task.source_agent_id,
                    json!({ "task_id": task.id, "reason": "unknown task kind" }),
                );
                self.alerts.send(&alert).await;
                Err(VigilError::TaskProcessing("unknown task kind".into()))
            }
        }
    }

    async fn report(&self, task: &Task, err: &VigilError) {
        let extra = json!({ "task_id": task.id, "task_kind": task.kind.as_str() });
        match err {
            VigilError::AgentKilled(_) => {
                alert_error(
                    self.alerts.as_ref(),
                    &task.source_agent_id,
                    "Agent killed during task processing",
                    extra,
                )
                .await;
            }
            VigilError::AgentPaused(_) => {
                alert_warning(
                    self.alerts.as_ref(),
                    &task.source_agent_id,
                    "Agent paused during task processing",
                    extra,
                )
                .await;
            }
            other => {
                let extra = json!({
                    "task_id": task.id,
                    "task_kind": task.kind.as_str(),
                    "error": other.to_string(),
                });
                alert_error(
                    self.alerts.as_ref(),
                    &task.source_agent_id,
                    "Task processing failed",
                    extra,
                )
                .await;
            }
        }
    }
}
