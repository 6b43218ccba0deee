//! # Status and Error Aggregation
//!
//! Per-binding failures are collected in [`SyncErrors`] instead of aborting
//! the pass. The orchestrator only asks whether anything was collected to pick
//! `Completed` or `Failed`, and hands the aggregate back to the caller.

use crate::crd::{BindInfoPhase, OperandBindInfo, OperandBindInfoStatus, ReconcileRequest};
use crate::ownership::OwnershipError;
use crate::store::{ObjectStore, StoreError};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// One failed unit of work inside a reconcile pass
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{operation} of {kind} {namespace}/{name} failed: {source}")]
    Store {
        operation: &'static str,
        kind: String,
        name: String,
        namespace: String,
        #[source]
        source: StoreError,
    },

    #[error("cannot record ownership of {kind} {namespace}/{name}: {source}")]
    Ownership {
        kind: String,
        name: String,
        namespace: String,
        #[source]
        source: OwnershipError,
    },

    #[error("OperandRequest {namespace}/{name} not found")]
    RequestNotFound { name: String, namespace: String },

    #[error("failed to read OperandRequest {namespace}/{name}: {source}")]
    RequestUnreadable {
        name: String,
        namespace: String,
        #[source]
        source: StoreError,
    },
}

/// Every failure collected during one pass
#[derive(Debug, Default)]
pub struct SyncErrors {
    errors: Vec<SyncError>,
}

impl SyncErrors {
    pub fn push(&mut self, error: SyncError) {
        self.errors.push(error);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyncError> {
        self.errors.iter()
    }
}

impl fmt::Display for SyncErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SyncErrors {}

/// Consumer namespaces in registry order, without duplicates
#[must_use]
pub fn unique_namespaces(consumers: &[ReconcileRequest]) -> Vec<String> {
    let mut namespaces: Vec<String> = Vec::with_capacity(consumers.len());
    for consumer in consumers {
        if !namespaces.contains(&consumer.namespace) {
            namespaces.push(consumer.namespace.clone());
        }
    }
    namespaces
}

/// Persist the outcome of a pass.
///
/// The write is skipped when neither the phase nor the namespaces changed.
/// Returns whether a write happened.
pub async fn update_phase<S: ObjectStore>(
    store: &S,
    bind_info: &mut OperandBindInfo,
    phase: BindInfoPhase,
    request_namespaces: Vec<String>,
) -> Result<bool, StoreError> {
    let desired = OperandBindInfoStatus {
        phase: Some(phase),
        request_namespaces,
    };
    if bind_info.status.as_ref() == Some(&desired) {
        debug!(%phase, "Skipping status update - phase and request namespaces unchanged");
        return Ok(false);
    }

    bind_info.status = Some(desired);
    *bind_info = store.update_bind_info_status(bind_info).await?;
    info!(%phase, "OperandBindInfo phase updated");
    Ok(true)
}
