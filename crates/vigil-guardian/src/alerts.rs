use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;
use vigil_core::{Alert, AlertKind};

/// Best-effort alert delivery.
///
/// `send` never raises to the caller: losing an alert is an accepted failure
/// mode, and the core must not depend on delivery succeeding.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Attempt to deliver one alert. At most one attempt, no retry.
    async fn send(&self, alert: &Alert);
}

/// Dispatcher that POSTs each alert to `<base>/infra-alerts` on the external
/// monitoring endpoint. Transport errors and non-2xx responses are logged
/// and swallowed.
pub struct HttpAlertSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAlertSink {
    /// Build a dispatcher for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/infra-alerts", base.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl AlertSink for HttpAlertSink {
    async fn send(&self, alert: &Alert) {
        match self.client.post(&self.endpoint).json(alert).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(
                    status = %response.status(),
                    kind = %alert.kind,
                    agent_id = %alert.agent_id,
                    "alert endpoint rejected alert"
                );
            }
            Err(err) => {
                warn!(
                    error = %err,
                    kind = %alert.kind,
                    agent_id = %alert.agent_id,
                    "failed to deliver alert"
                );
            }
        }
    }
}

/// Sink that drops every alert. For wiring without a monitoring endpoint.
pub struct NullAlertSink;

#[async_trait]
impl AlertSink for NullAlertSink {
    async fn send(&self, _alert: &Alert) {}
}

/// Test sink that keeps sent alerts in memory.
pub struct MemoryAlertSink {
    sent: parking_lot::Mutex<Vec<Alert>>,
}

impl MemoryAlertSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self {
            sent: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<Alert> {
        self.sent.lock().clone()
    }

    /// Number of sent alerts.
    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    /// Whether nothing has been sent.
    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

impl Default for MemoryAlertSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertSink for MemoryAlertSink {
    async fn send(&self, alert: &Alert) {
        self.sent.lock().push(alert.clone());
    }
}

fn merge_details(mut base: Value, extra: Value) -> Value {
    if let (Some(base_map), Value::Object(extra_map)) = (base.as_object_mut(), extra) {
        for (key, value) in extra_map {
            base_map.insert(key, value);
        }
    }
    base
}

/// Raise a [`AlertKind::SyncError`] alert.
pub async fn alert_error(sink: &dyn AlertSink, agent_id: &str, error: &str, extra: Value) {
    let details = merge_details(json!({ "error": error }), extra);
    sink.send(&Alert::new(AlertKind::SyncError, agent_id, details))
        .await;
}

/// Raise a [`AlertKind::SyncWarning`] alert.
pub async fn alert_warning(sink: &dyn AlertSink, agent_id: &str, warning: &str, extra: Value) {
    let details = merge_details(json!({ "warning": warning }), extra);
    sink.send(&Alert::new(AlertKind::SyncWarning, agent_id, details))
        .await;
}

/// Raise a [`AlertKind::SyncInfo`] alert.
pub async fn alert_info(sink: &dyn AlertSink, agent_id: &str, info: &str, extra: Value) {
    let details = merge_details(json!({ "info": info }), extra);
    sink.send(&Alert::new(AlertKind::SyncInfo, agent_id, details))
        .await;
}
