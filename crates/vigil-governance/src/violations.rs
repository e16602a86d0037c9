use serde_json::Value;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::error;
use vigil_core::Violation;

/// Append-only sink for governance violations.
///
/// Recording is fire-and-forget: a sink never raises to its caller.
pub trait ViolationSink: Send + Sync {
    /// Record one violation.
    fn record(&self, violation: Violation);
}

/// Build and record a violation in one call.
pub fn record_violation(
    sink: &dyn ViolationSink,
    agent_id: &str,
    violation: &str,
    details: Value,
) {
    sink.record(Violation::new(agent_id, violation, details));
}

/// Production sink: emits a structured `tracing` error line per violation
/// and, when configured with a directory, appends each record as a line of
/// JSON to `violations.jsonl` via a background writer task.
pub struct LogViolationSink {
    tx: Option<mpsc::UnboundedSender<Violation>>,
}

impl LogViolationSink {
    /// Log-only sink, no file persistence.
    pub fn new() -> Self {
        Self { tx: None }
    }

    /// Sink that additionally appends JSONL records under `log_dir`.
    pub fn with_jsonl(log_dir: PathBuf) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Violation>();

        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;

            let _ = tokio::fs::create_dir_all(&log_dir).await;
            let log_file = log_dir.join("violations.jsonl");

            while let Some(violation) = rx.recv().await {
                let Ok(line) = serde_json::to_string(&violation) else {
                    continue;
                };
                let open = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&log_file)
                    .await;
                if let Ok(mut file) = open {
                    let _ = file.write_all(format!("{line}\n").as_bytes()).await;
                }
            }
        });

        Self { tx: Some(tx) }
    }
}

impl Default for LogViolationSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ViolationSink for LogViolationSink {
    fn record(&self, violation: Violation) {
        error!(
            agent_id = %violation.agent_id,
            violation = %violation.violation,
            details = %violation.details,
            "governance violation"
        );
        if let Some(tx) = &self.tx {
            let _ = tx.send(violation);
        }
    }
}

/// Test sink that keeps recorded violations in memory.
pub struct MemoryViolationSink {
    entries: parking_lot::Mutex<Vec<Violation>>,
}

impl MemoryViolationSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self {
            entries: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of everything recorded so far.
    pub fn entries(&self) -> Vec<Violation> {
        self.entries.lock().clone()
    }

    /// Number of recorded violations.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for MemoryViolationSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ViolationSink for MemoryViolationSink {
    fn record(&self, violation: Violation) {
        self.entries.lock().push(violation);
    }
}
