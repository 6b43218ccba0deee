//! # Events
//!
//! Diagnostic events attached to OperandBindInfo resources, visible through
//! `kubectl describe opbi`.
//!
//! Emission is fire-and-forget: [`EventSink::emit`] never fails and a lost
//! event never affects reconciliation.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Well-known event reasons
pub mod reasons {
    /// Registry, OperandRequest or source object does not exist
    pub const NOT_FOUND: &str = "NotFound";
    /// The operand is not listed in the registry
    pub const OPERAND_NOT_FOUND: &str = "OperandNotFound";
    /// A Secret or ConfigMap could not be copied
    pub const SYNC_FAILED: &str = "SyncFailed";
    /// Every eligible object was copied
    pub const SYNCED: &str = "Synced";
}

/// Event action reported with every event
pub const ACTION_RECONCILE: &str = "Reconcile";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
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

/// Injected diagnostics channel
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, subject: &ObjectReference, severity: Severity, reason: &str, message: String);
}

#[async_trait]
impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    async fn emit(&self, subject: &ObjectReference, severity: Severity, reason: &str, message: String) {
        (**self).emit(subject, severity, reason, message).await;
    }
}

/// Publishes Kubernetes Events through `kube::runtime::events::Recorder`
pub struct KubeEventSink {
    recorder: Recorder,
}

impl std::fmt::Debug for KubeEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEventSink").finish_non_exhaustive()
    }
}

impl KubeEventSink {
    /// `controller_name` shows up as the reporting component of every event
    #[must_use]
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventSink for KubeEventSink {
    async fn emit(&self, subject: &ObjectReference, severity: Severity, reason: &str, message: String) {
        let event = Event {
            type_: severity.into(),
            reason: reason.to_string(),
            note: Some(message),
            action: ACTION_RECONCILE.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, subject).await {
            warn!(
                reason,
                error = %e,
                "Failed to publish Kubernetes event"
            );
        }
    }
}

/// An event captured by [`RecordingEventSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub subject_kind: Option<String>,
    pub subject_name: Option<String>,
    pub subject_namespace: Option<String>,
    pub severity: Severity,
    pub reason: String,
    pub message: String,
}

/// Keeps every event in memory so tests can assert on diagnostics
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events with the given reason
    #[must_use]
    pub fn with_reason(&self, reason: &str) -> Vec<RecordedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.reason == reason)
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn emit(&self, subject: &ObjectReference, severity: Severity, reason: &str, message: String) {
        let event = RecordedEvent {
            subject_kind: subject.kind.clone(),
            subject_name: subject.name.clone(),
            subject_namespace: subject.namespace.clone(),
            severity,
            reason: reason.to_string(),
            message,
        };
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
