use crate::{VigilError, VigilResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Kind of work a task requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Append an entry to an existing target page. Requires a `target_ref`.
    Log,
    /// Create a new target page.
    Create,
    /// Any kind this subsystem does not understand. Never passes submission
    /// validation, but stored rows may carry one.
    #[serde(other)]
    Unknown,
}

impl TaskKind {
    /// Parse a wire value. Anything other than `log` or `create` maps to
    /// [`TaskKind::Unknown`].
    pub fn parse(value: &str) -> Self {
        match value {
            "log" => TaskKind::Log,
            "create" => TaskKind::Create,
            _ => TaskKind::Unknown,
        }
    }

    /// The lowercase wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Log => "log",
            TaskKind::Create => "create",
            TaskKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling priority of a task. High drains before normal, normal before low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Drained first.
    High,
    /// The default tier.
    Normal,
    /// Drained last.
    Low,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Normal
    }
}

impl TaskPriority {
    /// Ascending sort key: high sorts before normal, normal before low.
    pub fn sort_key(&self) -> i64 {
        match self {
            TaskPriority::High => 1,
            TaskPriority::Normal => 2,
            TaskPriority::Low => 3,
        }
    }

    /// Parse a wire value, falling back to [`TaskPriority::Normal`].
    pub fn parse(value: &str) -> Self {
        match value {
            "high" => TaskPriority::High,
            "low" => TaskPriority::Low,
            _ => TaskPriority::Normal,
        }
    }

    /// The lowercase wire name of this priority.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "high",
            TaskPriority::Normal => "normal",
            TaskPriority::Low => "low",
        }
    }
}

/// Status of a task in its lifecycle.
///
/// Transitions only ever move `Pending → Processing → {Completed, Failed}`.
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting in the queue.
    Pending,
    /// Claimed by the consumer.
    Processing,
    /// Handler succeeded. Terminal.
    Completed,
    /// Handler or governance check failed. Terminal.
    Failed,
}

impl TaskStatus {
    /// Strictly parse a wire value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TaskStatus::Pending),
            "processing" => Some(TaskStatus::Processing),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }

    /// The lowercase wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Whether a task in this status must never be re-selected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// A task record as persisted in the task store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier.
    pub id: Uuid,
    /// What kind of work this task requests.
    pub kind: TaskKind,
    /// The payload handed to the handler.
    pub content: String,
    /// Reference to an existing target page. Required for [`TaskKind::Log`].
    pub target_ref: Option<String>,
    /// The agent that submitted the task.
    pub source_agent_id: String,
    /// Scheduling priority.
    pub priority: TaskPriority,
    /// Free-form metadata. `metadata.error` is populated on failure.
    pub metadata: Map<String, Value>,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Store-assigned creation time.
    pub created_at: DateTime<Utc>,
    /// Set on every status write past pending.
    pub processed_at: Option<DateTime<Utc>>,
}

/// A task submission before it is persisted.
///
/// The store assigns `id`, `created_at`, and the initial `Pending` status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    /// What kind of work this task requests.
    pub kind: TaskKind,
    /// The payload handed to the handler.
    pub content: String,
    /// Reference to an existing target page.
    #[serde(default)]
    pub target_ref: Option<String>,
    /// The agent submitting the task.
    pub source_agent_id: String,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: TaskPriority,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl NewTask {
    /// Create a submission with default priority and empty metadata.
    pub fn new(
        kind: TaskKind,
        content: impl Into<String>,
        source_agent_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            content: content.into(),
            target_ref: None,
            source_agent_id: source_agent_id.into(),
            priority: TaskPriority::default(),
            metadata: Map::new(),
        }
    }

    /// Set the target page reference.
    pub fn with_target_ref(mut self, target_ref: impl Into<String>) -> Self {
        self.target_ref = Some(target_ref.into());
        self
    }

    /// Set the scheduling priority.
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Check submission invariants. A failing submission never reaches the
    /// store.
    pub fn validate(&self) -> VigilResult<()> {
        if self.content.is_empty() {
            return Err(VigilError::Validation("content is required".into()));
        }
        if self.kind == TaskKind::Unknown {
            return Err(VigilError::Validation(
                "type must be \"log\" or \"create\"".into(),
            ));
        }
        if self.kind == TaskKind::Log
            && self.target_ref.as_deref().map_or(true, str::is_empty)
        {
            return Err(VigilError::Validation(
                "targetRef is required for log tasks".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_sort_keys_ascending() {
        assert!(TaskPriority::High.sort_key() < TaskPriority::Normal.sort_key());
        assert!(TaskPriority::Normal.sort_key() < TaskPriority::Low.sort_key());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(TaskKind::parse("log"), TaskKind::Log);
        assert_eq!(TaskKind::parse("create"), TaskKind::Create);
        assert_eq!(TaskKind::parse("delete"), TaskKind::Unknown);
    }

    #[test]
    fn test_kind_unknown_from_serde() {
        let kind: TaskKind = serde_json::from_str("\"archive\"").unwrap();
        assert_eq!(kind, TaskKind::Unknown);
    }

    #[test]
    fn test_status_terminal() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
    }

    #[test]
    fn test_validate_log_requires_target_ref() {
        let task = NewTask::new(TaskKind::Log, "x", "agent-1");
        assert!(matches!(
            task.validate(),
            Err(VigilError::Validation(_))
        ));

        let task = NewTask::new(TaskKind::Log, "x", "agent-1").with_target_ref("");
        assert!(task.validate().is_err());

        let task = NewTask::new(TaskKind::Log, "x", "agent-1").with_target_ref("page-1");
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_validate_create_needs_no_target_ref() {
        let task = NewTask::new(TaskKind::Create, "hello", "agent-1");
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_content_and_unknown_kind() {
        let task = NewTask::new(TaskKind::Create, "", "agent-1");
        assert!(task.validate().is_err());

        let task = NewTask::new(TaskKind::Unknown, "hello", "agent-1");
        assert!(task.validate().is_err());
    }

    #[test]
    fn test_new_task_defaults() {
        let task = NewTask::new(TaskKind::Create, "hello", "agent-1");
        assert_eq!(task.priority, TaskPriority::Normal);
        assert!(task.metadata.is_empty());
        assert!(task.target_ref.is_none());
    }
}
