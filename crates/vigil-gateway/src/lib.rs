//! Thin HTTP boundary for task submission.
//!
//! Routing and request parsing live here; everything of substance is
//! delegated to the store and governance crates. The state gate is applied
//! to the submission route only — health stays reachable for killed agents.

/// Route handlers and the router constructor.
pub mod server;

pub use server::{build_router, AppState};
