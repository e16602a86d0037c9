use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;
use vigil_core::{NewTask, Task, TaskStatus, VigilResult};

/// The durable priority task queue.
///
/// Status writes targeting an unknown id are deliberate no-ops: the consumer
/// loop must stay robust against races with external cleanup, at the cost of
/// silently dropping such writes.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Validate and insert a submission with status `Pending` and a
    /// store-assigned creation time. Returns the new task id.
    async fn enqueue(&self, task: NewTask) -> VigilResult<Uuid>;

    /// Fetch up to `limit` pending tasks, ordered by priority (high, normal,
    /// low) and creation time ascending within a tier. Does not claim them.
    async fn pending_batch(&self, limit: usize) -> VigilResult<Vec<Task>>;

    /// Move a task to `Processing` and stamp `processed_at`.
    async fn mark_processing(&self, id: Uuid) -> VigilResult<()>;

    /// Move a task to `Completed` and stamp `processed_at`.
    async fn mark_completed(&self, id: Uuid) -> VigilResult<()>;

    /// Move a task to `Failed`, stamp `processed_at`, and merge the error
    /// text into `metadata.error` without discarding other metadata keys.
    async fn mark_failed(&self, id: Uuid, error: &str) -> VigilResult<()>;
}

/// In-memory task store for tests and local wiring.
pub struct InMemoryTaskStore {
    tasks: RwLock<Vec<Task>>,
}

impl InMemoryTaskStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(Vec::new()),
        }
    }

    /// Fetch a task by id (test helper).
    pub async fn get(&self, id: Uuid) -> Option<Task> {
        self.tasks.read().await.iter().find(|t| t.id == id).cloned()
    }

    /// Total number of stored tasks (test helper).
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Whether the store holds no tasks.
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    async fn set_status(&self, id: Uuid, status: TaskStatus) {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
            task.status = status;
            task.processed_at = Some(Utc::now());
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn enqueue(&self, task: NewTask) -> VigilResult<Uuid> {
        task.validate()?;
        let id = Uuid::new_v4();
        let record = Task {
            id,
            kind: task.kind,
            content: task.content,
            target_ref: task.target_ref,
            source_agent_id: task.source_agent_id,
            priority: task.priority,
            metadata: task.metadata,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
        };
        self.tasks.write().await.push(record);
        Ok(id)
    }

    async fn pending_batch(&self, limit: usize) -> VigilResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let mut pending: Vec<Task> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|t| (t.priority.sort_key(), t.created_at));
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_processing(&self, id: Uuid) -> VigilResult<()> {
        self.set_status(id, TaskStatus::Processing).await;
        Ok(())
    }

    async fn mark_completed(&self, id: Uuid) -> VigilResult<()> {
        self.set_status(id, TaskStatus::Completed).await;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> VigilResult<()> {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
            task.status = TaskStatus::Failed;
            task.processed_at = Some(Utc::now());
            task.metadata
                .insert("error".to_string(), Value::String(error.to_string()));
        }
        Ok(())
    }
}
