use async_trait::async_trait;
use eevee_model::constants::OPERATOR;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::Client;
use kube_runtime::events::{Event, EventType, Recorder, Reporter};
use log::warn;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Severity {
    Normal,
    Warning,
}

impl From<Severity> for EventType {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Normal => EventType::Normal,
            Severity::Warning => EventType::Warning,
        }
    }
}

/// Publishes Kubernetes events about the objects the operator manages. Emitting is best effort: a
/// failure is logged and never reaches the caller.
#[async_trait]
pub(crate) trait EventSink: Send + Sync {
    async fn emit(&self, owner: &ObjectReference, severity: Severity, reason: &str, message: &str);
}

pub(crate) struct KubeEventSink {
    client: Client,
    reporter: Reporter,
}

impl KubeEventSink {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            reporter: Reporter {
                controller: OPERATOR.to_owned(),
                instance: std::env::var("POD_NAME").ok(),
            },
        }
    }
}

#[async_trait]
impl EventSink for KubeEventSink {
    async fn emit(&self, owner: &ObjectReference, severity: Severity, reason: &str, message: &str) {
        let recorder = Recorder::new(self.client.clone(), self.reporter.clone(), owner.clone());
        let event = Event {
            type_: severity.into(),
            reason: reason.to_owned(),
            note: Some(message.to_owned()),
            action: reason.to_owned(),
            secondary: None,
        };
        if let Err(e) = recorder.publish(event).await {
            warn!(
                "Unable to publish '{}' event for '{}': {}",
                reason,
                owner.name.as_deref().unwrap_or_default(),
                e
            );
        }
    }
}

/// Keeps every event in memory.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingEventSink {
    events: std::sync::Mutex<Vec<(String, Severity, String, String)>>,
}

#[cfg(test)]
impl RecordingEventSink {
    /// Recorded events as `(object name, severity, reason, message)`.
    pub(crate) fn events(&self) -> Vec<(String, Severity, String, String)> {
        self.events.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl EventSink for RecordingEventSink {
    async fn emit(&self, owner: &ObjectReference, severity: Severity, reason: &str, message: &str) {
        self.events.lock().unwrap().push((
            owner.name.clone().unwrap_or_default(),
            severity,
            reason.to_owned(),
            message.to_owned(),
        ));
    }
}
