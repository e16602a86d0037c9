//! Storage backends for the Vigil subsystem.
//!
//! Two seams are defined here: [`AgentRegistry`] (read-only view of the agent
//! population, written by an external control plane) and [`TaskStore`] (the
//! durable priority queue drained by the task consumer).
//!
//! The production backend is SQLite ([`SqliteStore`]); in-memory
//! implementations exist for tests and for wiring without a database file.

/// The agent registry seam and its in-memory implementation.
pub mod registry;
/// SQLite-backed registry and task store.
pub mod sqlite;
/// The task store seam and its in-memory implementation.
pub mod tasks;

pub use registry::{AgentRegistry, InMemoryAgentRegistry};
pub use sqlite::{SqliteAgentRegistry, SqliteStore, SqliteTaskStore};
pub use tasks::{InMemoryTaskStore, TaskStore};
