//! Agent governance: the state gate, the state validator, and the violation
//! recorder.
//!
//! Two checks guard agent actions at different depths. The [`StateGate`] sits
//! at the transport boundary and hard-stops killed agents only; the
//! [`StateValidator`] runs immediately before a task's side effect and blocks
//! paused agents as well. Both record every refusal through a
//! [`ViolationSink`].

/// The transport-boundary state gate and its axum middleware.
pub mod gate;
/// Pre-execution agent state validation.
pub mod validate;
/// Append-only violation recording.
pub mod violations;

pub use gate::{
    agent_id_from_headers, state_gate, AgentStateResolver, ErrorBody, GateDecision,
    HeaderStateResolver, StateGate,
};
pub use validate::StateValidator;
pub use violations::{record_violation, LogViolationSink, MemoryViolationSink, ViolationSink};
