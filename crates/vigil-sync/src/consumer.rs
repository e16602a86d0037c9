use crate::processor::TaskProcessor;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use vigil_guardian::{alert_error, AlertSink};
use vigil_store::TaskStore;

const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;
const DEFAULT_BATCH_SIZE: usize = 10;

/// Configuration for the task consumer loop.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Identity the consumer reports in logs and alerts.
    pub worker_id: String,
    /// Delay between the end of one tick and the start of the next.
    pub poll_interval: Duration,
    /// Maximum number of tasks fetched per tick.
    pub batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            worker_id: "task-sync-001".to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl SyncConfig {
    /// Read configuration from `VIGIL_SYNC_POLL_INTERVAL_MS` and
    /// `VIGIL_SYNC_BATCH_SIZE`, falling back to defaults for anything
    /// missing or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var("VIGIL_SYNC_POLL_INTERVAL_MS") {
            if let Ok(ms) = value.parse::<u64>() {
                config.poll_interval = Duration::from_millis(ms);
            }
        }
        if let Ok(value) = std::env::var("VIGIL_SYNC_BATCH_SIZE") {
            if let Ok(size) = value.parse::<usize>() {
                config.batch_size = size;
            }
        }
        config
    }
}

/// The polling task consumer.
///
/// Single loop, one batch at a time, tasks within a batch strictly
/// sequential — this bounds resource use and keeps per-task failures
/// isolated, at the cost of throughput.
pub struct TaskConsumer {
    store: Arc<dyn TaskStore>,
    processor: TaskProcessor,
    alerts: Arc<dyn AlertSink>,
    config: SyncConfig,
}

impl TaskConsumer {
    /// Build a consumer from its collaborators.
    pub fn new(
        store: Arc<dyn TaskStore>,
        processor: TaskProcessor,
        alerts: Arc<dyn AlertSink>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            processor,
            alerts,
            config,
        }
    }

    /// Run a single poll tick.
    ///
    /// Never raises: a fetch failure is logged and alerted, a per-task
    /// failure is recorded on the task, and in both cases the loop lives on.
    /// An empty queue is a silent no-op.
    pub async fn tick(&self) {
        let worker_id = &self.config.worker_id;

        let tasks = match self.store.pending_batch(self.config.batch_size).await {
            Ok(tasks) => tasks,
            Err(err) => {
                error!(worker_id = %worker_id, error = %err, "failed to fetch pending tasks");
                alert_error(
                    self.alerts.as_ref(),
                    worker_id,
                    "Failed to process task queue",
                    json!({ "error": err.to_string() }),
                )
                .await;
                return;
            }
        };

        if tasks.is_empty() {
            return;
        }
        info!(worker_id = %worker_id, count = tasks.len(), "tasks fetched");

        for task in &tasks {
            if let Err(err) = self.store.mark_processing(task.id).await {
                error!(
                    worker_id = %worker_id,
                    task_id = %task.id,
                    error = %err,
                    "failed to claim task"
                );
                continue;
            }

            match self.processor.process(task).await {
                Ok(()) => {
                    if let Err(err) = self.store.mark_completed(task.id).await {
                        error!(
                            worker_id = %worker_id,
                            task_id = %task.id,
                            error = %err,
                            "failed to record task completion"
                        );
                        continue;
                    }
                    info!(
                        worker_id = %worker_id,
                        task_id = %task.id,
                        kind = %task.kind,
                        source_agent_id = %task.source_agent_id,
                        "task processed"
                    );
                }
                Err(err) => {
                    let message = err.to_string();
                    if let Err(mark_err) = self.store.mark_failed(task.id, &message).await {
                        error!(
                            worker_id = %worker_id,
                            task_id = %task.id,
                            error = %mark_err,
                            "failed to record task failure"
                        );
                    }
                    warn!(
                        worker_id = %worker_id,
                        task_id = %task.id,
                        error = %message,
                        "task failed"
                    );
                }
            }
        }
    }

    /// Start the consumer loop.
    ///
    /// The next tick is scheduled only after the current one finishes, so
    /// ticks of the same consumer never overlap. Returns the task handle so
    /// the owner can abort it; there is no implicit auto-start.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let interval = self.config.poll_interval;
        tokio::spawn(async move {
            info!(
                worker_id = %self.config.worker_id,
                poll_interval_ms = interval.as_millis() as u64,
                batch_size = self.config.batch_size,
                "task consumer started"
            );
            loop {
                self.tick().await;
                tokio::time::sleep(interval).await;
            }
        })
    }
}
