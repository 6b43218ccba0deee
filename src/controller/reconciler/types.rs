//! # Types
//!
//! Core types for the reconciler.

use crate::controller::reconciler::status::SyncErrors;
use crate::events::EventSink;
use crate::store::{ObjectStore, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// Reading or writing the OperandBindInfo itself failed
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("OperandRegistry {namespace}/{name} not found")]
    RegistryNotFound { name: String, namespace: String },

    #[error("operand {operand} not found in OperandRegistry {registry}")]
    OperandNotFound { operand: String, registry: String },

    #[error("{count} object(s) failed to sync: {0}", count = .0.len())]
    Sync(SyncErrors),

    #[error("failed to update OperandBindInfo status: {0}")]
    Status(#[source] StoreError),
}

impl ReconcilerError {
    /// Short label used for the requeue metric
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcilerError::Store(_) => "store",
            ReconcilerError::RegistryNotFound { .. } => "registry-not-found",
            ReconcilerError::OperandNotFound { .. } => "operand-not-found",
            ReconcilerError::Sync(_) => "sync-failed",
            ReconcilerError::Status(_) => "status",
        }
    }
}

/// Result of a successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The OperandBindInfo no longer exists
    Deleted,
    /// No OperandRequest depends on the operand yet; the phase was left alone
    NoConsumers,
    /// Every eligible object was copied and the phase is `Completed`
    Synced(SyncSummary),
}

/// Counters for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub missing: usize,
}

/// Reconciler for OperandBindInfo resources
///
/// Holds no mutable state; every pass works on freshly read objects, so
/// different keys may be reconciled concurrently.
#[derive(Debug, Clone)]
pub struct Reconciler<S, E> {
    pub(crate) store: S,
    pub(crate) events: E,
}

impl<S: ObjectStore, E: EventSink> Reconciler<S, E> {
    #[must_use]
    pub fn new(store: S, events: E) -> Self {
        Self { store, events }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn events(&self) -> &E {
        &self.events
    }
}
