//! # Runtime
//!
//! Wires the reconciler into `kube-runtime`: startup, the watch loop and the
//! error policy.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

use crate::config::ControllerConfig;
use crate::controller::backoff::BackoffState;
use crate::controller::reconciler::Reconciler;
use crate::events::KubeEventSink;
use crate::store::KubeStore;
use std::collections::HashMap;
use std::sync::Mutex;

/// Reconciler talking to a live cluster
pub type KubeReconciler = Reconciler<KubeStore, KubeEventSink>;

/// Shared context handed to every reconcile and error-policy call
#[derive(Debug)]
pub struct Context {
    pub reconciler: KubeReconciler,
    pub config: ControllerConfig,
    /// Backoff state per resource (identified by namespace/name)
    pub backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl Context {
    #[must_use]
    pub fn new(reconciler: KubeReconciler, config: ControllerConfig) -> Self {
        Self {
            reconciler,
            config,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }
}

/// Key of the per-resource backoff map
#[must_use]
pub fn resource_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}
