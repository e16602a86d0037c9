use thiserror::Error;

/// Convenience alias for `Result<T, VigilError>`.
pub type VigilResult<T> = Result<T, VigilError>;

/// Top-level error type for the Vigil subsystem.
///
/// Governance failures (`AgentNotFound`, `AgentKilled`, `AgentPaused`) carry
/// the offending agent id so callers can surface them distinctly.
#[derive(Error, Debug)]
pub enum VigilError {
    /// A malformed task submission, rejected before persistence.
    #[error("Invalid task submission: {0}")]
    Validation(String),

    /// The agent id has no row in the registry.
    #[error("Agent {0} not found")]
    AgentNotFound(String),

    /// The agent is in the killed state.
    #[error("Agent {0} is killed")]
    AgentKilled(String),

    /// The agent is in the paused state.
    #[error("Agent {0} is paused")]
    AgentPaused(String),

    /// An opaque handler failure during task processing.
    #[error("Task processing failed: {0}")]
    TaskProcessing(String),

    /// A failure delivering an alert. Always swallowed by the dispatcher.
    #[error("Alert delivery failed: {0}")]
    AlertDelivery(String),

    /// An error from the backing store.
    #[error("Store error: {0}")]
    Store(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from an outbound HTTP request.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VigilError {
    /// Whether this error is a governance failure (agent missing, killed,
    /// or paused) as opposed to an operational one.
    pub fn is_governance(&self) -> bool {
        matches!(
            self,
            Self::AgentNotFound(_) | Self::AgentKilled(_) | Self::AgentPaused(_)
        )
    }
}
