//! The guardian: best-effort alert delivery and the agent monitoring loop.
//!
//! Alerts are diagnostic, not transactional — the dispatcher makes at most
//! one delivery attempt per alert and swallows every failure. The
//! [`GuardianMonitor`] sweeps the full agent registry on a fixed interval,
//! records violations for killed agents, and raises alerts through the
//! dispatcher.

/// Alert sinks and the outbound HTTP dispatcher.
pub mod alerts;
/// The registry-sweeping monitor loop.
pub mod monitor;

pub use alerts::{
    alert_error, alert_info, alert_warning, AlertSink, HttpAlertSink, MemoryAlertSink,
    NullAlertSink,
};
pub use monitor::{CycleSummary, GuardianMonitor};
