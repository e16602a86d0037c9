//! The task consumer: a timer-driven loop that drains the task store under
//! governance.
//!
//! Each tick fetches a priority-ordered batch of pending tasks and processes
//! them strictly sequentially: claim, re-validate the submitting agent's
//! state, dispatch to the page-service handler, record the outcome. A failing
//! task never aborts its batch, and a failing tick never stops the loop.

/// The consumer loop and its configuration.
pub mod consumer;
/// The page-service handler contract.
pub mod handler;
/// Per-task processing under governance.
pub mod processor;

pub use consumer::{SyncConfig, TaskConsumer};
pub use handler::{LoggingPageService, PageService};
pub use processor::TaskProcessor;
