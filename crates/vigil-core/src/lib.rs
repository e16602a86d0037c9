//! Core types and error definitions for the Vigil governance subsystem.
//!
//! This crate provides the foundational types shared across all Vigil crates:
//! the agent lifecycle model, the task record and its submission payload,
//! governance violation records, and alert records.
//!
//! # Main types
//!
//! - [`VigilError`] — Unified error enum for all Vigil subsystems.
//! - [`VigilResult`] — Convenience alias for `Result<T, VigilError>`.
//! - [`AgentState`] — Tri-state agent lifecycle (active, paused, killed).
//! - [`Task`] / [`NewTask`] — A persisted task and its submission payload.
//! - [`Violation`] — An append-only governance violation record.
//! - [`Alert`] — A best-effort diagnostic alert record.

/// Agent identity and lifecycle state.
pub mod agent;
/// Alert records delivered to the external monitoring endpoint.
pub mod alert;
/// Error types.
pub mod error;
/// Task records, priorities, and the status lifecycle.
pub mod task;
/// Governance violation records.
pub mod violation;

pub use agent::{Agent, AgentState};
pub use alert::{Alert, AlertKind};
pub use error::{VigilError, VigilResult};
pub use task::{NewTask, Task, TaskKind, TaskPriority, TaskStatus};
pub use violation::Violation;
