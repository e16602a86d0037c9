use crate::{AgentRegistry, TaskStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;
use vigil_core::{
    Agent, AgentState, NewTask, Task, TaskKind, TaskPriority, TaskStatus, VigilError, VigilResult,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS agents (
    id    TEXT PRIMARY KEY,
    state TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS tasks (
    id              TEXT PRIMARY KEY,
    kind            TEXT NOT NULL,
    content         TEXT NOT NULL,
    target_ref      TEXT,
    source_agent_id TEXT NOT NULL,
    priority        TEXT NOT NULL DEFAULT 'normal',
    metadata        TEXT NOT NULL DEFAULT '{}',
    status          TEXT NOT NULL DEFAULT 'pending',
    created_at      INTEGER NOT NULL,
    processed_at    INTEGER
);
CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks (status);
";

fn store_err(err: rusqlite::Error) -> VigilError {
    VigilError::Store(err.to_string())
}

/// A SQLite database holding the agent registry and the task queue.
///
/// The connection is shared behind a mutex; every operation takes the lock
/// for the duration of its statement(s) only and never across an await point.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> VigilResult<Self> {
        let conn = Connection::open(path).map_err(store_err)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database. Useful for tests.
    pub fn open_in_memory() -> VigilResult<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> VigilResult<Self> {
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// A [`TaskStore`] view over this database.
    pub fn task_store(&self) -> SqliteTaskStore {
        SqliteTaskStore {
            conn: Arc::clone(&self.conn),
        }
    }

    /// An [`AgentRegistry`] view over this database.
    pub fn agent_registry(&self) -> SqliteAgentRegistry {
        SqliteAgentRegistry {
            conn: Arc::clone(&self.conn),
        }
    }

    /// Insert or overwrite an agent row.
    ///
    /// The registry is read-only for the subsystem itself; this exists for
    /// the control-plane CLI command and for tests.
    pub fn put_agent(&self, id: &str, state: AgentState) -> VigilResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO agents (id, state) VALUES (?1, ?2)
             ON CONFLICT (id) DO UPDATE SET state = excluded.state",
            params![id, state.as_str()],
        )
        .map_err(store_err)?;
        Ok(())
    }
}

/// SQLite-backed implementation of [`AgentRegistry`].
pub struct SqliteAgentRegistry {
    conn: Arc<Mutex<Connection>>,
}

fn row_to_agent(row: &Row<'_>) -> rusqlite::Result<Agent> {
    let id: String = row.get(0)?;
    let state: String = row.get(1)?;
    Ok(Agent {
        id,
        // Rows are written with strict state names; anything foreign maps to
        // active, matching the permissive hint handling at the gate.
        state: AgentState::from_hint(&state),
    })
}

#[async_trait]
impl AgentRegistry for SqliteAgentRegistry {
    async fn get(&self, id: &str) -> VigilResult<Option<Agent>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, state FROM agents WHERE id = ?1")
            .map_err(store_err)?;
        let mut rows = stmt
            .query_map(params![id], row_to_agent)
            .map_err(store_err)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(store_err)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> VigilResult<Vec<Agent>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, state FROM agents ORDER BY id")
            .map_err(store_err)?;
        let rows = stmt.query_map([], row_to_agent).map_err(store_err)?;
        let mut agents = Vec::new();
        for row in rows {
            agents.push(row.map_err(store_err)?);
        }
        Ok(agents)
    }
}

/// SQLite-backed implementation of [`TaskStore`].
pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
}

fn micros_to_datetime(micros: i64) -> VigilResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| VigilError::Store(format!("invalid timestamp in task row: {micros}")))
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<(Task, i64, Option<i64>)> {
    let id: String = row.get(0)?;
    let kind: String = row.get(1)?;
    let content: String = row.get(2)?;
    let target_ref: Option<String> = row.get(3)?;
    let source_agent_id: String = row.get(4)?;
    let priority: String = row.get(5)?;
    let metadata: String = row.get(6)?;
    let status: String = row.get(7)?;
    let created_at: i64 = row.get(8)?;
    let processed_at: Option<i64> = row.get(9)?;

    let id = Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::nil());
    let metadata: Map<String, Value> = serde_json::from_str(&metadata).unwrap_or_default();
    let status = TaskStatus::parse(&status).unwrap_or(TaskStatus::Failed);

    let task = Task {
        id,
        kind: TaskKind::parse(&kind),
        content,
        target_ref,
        source_agent_id,
        priority: TaskPriority::parse(&priority),
        metadata,
        status,
        // Placeholder timestamps; replaced by the caller from the raw columns.
        created_at: Utc::now(),
        processed_at: None,
    };
    Ok((task, created_at, processed_at))
}

fn finish_task(raw: (Task, i64, Option<i64>)) -> VigilResult<Task> {
    let (mut task, created, processed) = raw;
    task.created_at = micros_to_datetime(created)?;
    task.processed_at = match processed {
        Some(micros) => Some(micros_to_datetime(micros)?),
        None => None,
    };
    Ok(task)
}

impl SqliteTaskStore {
    /// Fetch a single task by id. Returns `None` for unknown ids.
    pub async fn get(&self, id: Uuid) -> VigilResult<Option<Task>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, kind, content, target_ref, source_agent_id, priority,
                        metadata, status, created_at, processed_at
                 FROM tasks WHERE id = ?1",
            )
            .map_err(store_err)?;
        let mut rows = stmt
            .query_map(params![id.to_string()], row_to_task)
            .map_err(store_err)?;
        match rows.next() {
            Some(row) => Ok(Some(finish_task(row.map_err(store_err)?)?)),
            None => Ok(None),
        }
    }

    fn set_status(&self, id: Uuid, status: TaskStatus) -> VigilResult<()> {
        let conn = self.conn.lock();
        // Zero affected rows means the id is unknown; deliberately a no-op.
        conn.execute(
            "UPDATE tasks SET status = ?2, processed_at = ?3 WHERE id = ?1",
            params![id.to_string(), status.as_str(), Utc::now().timestamp_micros()],
        )
        .map_err(store_err)?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn enqueue(&self, task: NewTask) -> VigilResult<Uuid> {
        task.validate()?;
        let id = Uuid::new_v4();
        let metadata = serde_json::to_string(&task.metadata)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO tasks
                 (id, kind, content, target_ref, source_agent_id, priority,
                  metadata, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8)",
            params![
                id.to_string(),
                task.kind.as_str(),
                task.content,
                task.target_ref,
                task.source_agent_id,
                task.priority.as_str(),
                metadata,
                Utc::now().timestamp_micros(),
            ],
        )
        .map_err(store_err)?;
        Ok(id)
    }

    async fn pending_batch(&self, limit: usize) -> VigilResult<Vec<Task>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, kind, content, target_ref, source_agent_id, priority,
                        metadata, status, created_at, processed_at
                 FROM tasks
                 WHERE status = 'pending'
                 ORDER BY
                     CASE priority
                         WHEN 'high' THEN 1
                         WHEN 'normal' THEN 2
                         ELSE 3
                     END,
                     created_at ASC
                 LIMIT ?1",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![limit as i64], row_to_task)
            .map_err(store_err)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(finish_task(row.map_err(store_err)?)?);
        }
        Ok(tasks)
    }

    async fn mark_processing(&self, id: Uuid) -> VigilResult<()> {
        self.set_status(id, TaskStatus::Processing)
    }

    async fn mark_completed(&self, id: Uuid) -> VigilResult<()> {
        self.set_status(id, TaskStatus::Completed)
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> VigilResult<()> {
        let conn = self.conn.lock();
        let current: Option<String> = conn
            .query_row(
                "SELECT metadata FROM tasks WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(store_err(other)),
            })?;

        // Unknown id: keep the no-op contract.
        let Some(current) = current else {
            return Ok(());
        };

        let mut metadata: Map<String, Value> =
            serde_json::from_str(&current).unwrap_or_default();
        metadata.insert("error".to_string(), Value::String(error.to_string()));
        let merged = serde_json::to_string(&metadata)?;

        conn.execute(
            "UPDATE tasks SET status = 'failed', metadata = ?2, processed_at = ?3
             WHERE id = ?1",
            params![id.to_string(), merged, Utc::now().timestamp_micros()],
        )
        .map_err(store_err)?;
        Ok(())
    }
}
