//! # Resource Synchronization
//!
//! Idempotent copy of one Secret or ConfigMap from the operand namespace into a
//! consumer namespace.
//!
//! ## Steps
//!
//! 1. Read the source. A missing source is reported and skipped.
//! 2. Build the copy (labels and payload only) under the consumer's name.
//! 3. Make the OperandRequest the controller of the copy.
//! 4. Create the copy, falling back to an update when it already exists.
//! 5. Point the source back at the OperandBindInfo and persist it.

use crate::crd::{OperandBindInfo, OperandRequest};
use crate::events::{reasons, EventSink, Severity};
use crate::observability::metrics;
use crate::ownership::{set_controller_reference, set_owner_reference};
use crate::store::{ObjectStore, StoreResource};
use crate::controller::reconciler::status::SyncError;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::ObjectMeta;
use kube::Resource;
use tracing::{debug, info, warn};

/// An object kind the controller knows how to copy
pub trait Replicable: StoreResource {
    /// A fresh object named `name` in `namespace` carrying this object's
    /// labels and payload. Nothing else is carried over.
    fn replicate(&self, name: &str, namespace: &str) -> Self;
}

fn copy_meta(source: &ObjectMeta, name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: source.labels.clone(),
        ..Default::default()
    }
}

impl Replicable for Secret {
    fn replicate(&self, name: &str, namespace: &str) -> Self {
        Secret {
            metadata: copy_meta(&self.metadata, name, namespace),
            type_: self.type_.clone(),
            data: self.data.clone(),
            string_data: self.string_data.clone(),
            ..Default::default()
        }
    }
}

impl Replicable for ConfigMap {
    fn replicate(&self, name: &str, namespace: &str) -> Self {
        ConfigMap {
            metadata: copy_meta(&self.metadata, name, namespace),
            data: self.data.clone(),
            ..Default::default()
        }
    }
}

/// Where one object is copied from and to
#[derive(Debug, Clone, Copy)]
pub struct SyncTarget<'a> {
    pub source_name: &'a str,
    pub source_namespace: &'a str,
    pub target_name: &'a str,
    pub target_namespace: &'a str,
}

impl SyncTarget<'_> {
    fn is_complete(&self) -> bool {
        !(self.source_name.is_empty()
            || self.source_namespace.is_empty()
            || self.target_name.is_empty()
            || self.target_namespace.is_empty())
    }
}

/// What a successful sync did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A name or namespace was empty
    Skipped,
    /// The source object does not exist yet
    SourceMissing,
    /// The copy was written; `created` is false when an existing copy was updated
    Copied { created: bool },
}

/// Copy a Secret into a consumer namespace
pub async fn sync_secret<S: ObjectStore, E: EventSink>(
    store: &S,
    events: &E,
    target: &SyncTarget<'_>,
    bind_info: &OperandBindInfo,
    request: &OperandRequest,
) -> Result<SyncOutcome, SyncError> {
    sync_object::<Secret, S, E>(store, events, target, bind_info, request).await
}

/// Copy a ConfigMap into a consumer namespace
pub async fn sync_config_map<S: ObjectStore, E: EventSink>(
    store: &S,
    events: &E,
    target: &SyncTarget<'_>,
    bind_info: &OperandBindInfo,
    request: &OperandRequest,
) -> Result<SyncOutcome, SyncError> {
    sync_object::<ConfigMap, S, E>(store, events, target, bind_info, request).await
}

async fn sync_object<K: Replicable, S: ObjectStore, E: EventSink>(
    store: &S,
    events: &E,
    target: &SyncTarget<'_>,
    bind_info: &OperandBindInfo,
    request: &OperandRequest,
) -> Result<SyncOutcome, SyncError> {
    let kind = K::kind(&()).to_string();
    if !target.is_complete() {
        debug!(%kind, ?target, "Nothing to copy");
        return Ok(SyncOutcome::Skipped);
    }

    let mut source = match store.get::<K>(target.source_name, target.source_namespace).await {
        Ok(source) => source,
        Err(e) if e.is_not_found() => {
            warn!(
                %kind,
                source = target.source_name,
                source_namespace = target.source_namespace,
                "Source object not found, skipping"
            );
            metrics::increment_source_objects_missing(&kind);
            events
                .emit(
                    &bind_info.object_ref(&()),
                    Severity::Warning,
                    reasons::NOT_FOUND,
                    format!(
                        "No {kind} {} in the namespace {}",
                        target.source_name, target.source_namespace
                    ),
                )
                .await;
            return Ok(SyncOutcome::SourceMissing);
        }
        Err(source) => {
            return Err(SyncError::Store {
                operation: "get",
                kind,
                name: target.source_name.to_string(),
                namespace: target.source_namespace.to_string(),
                source,
            });
        }
    };

    let mut copy = source.replicate(target.target_name, target.target_namespace);
    set_controller_reference(request, copy.meta_mut()).map_err(|source| SyncError::Ownership {
        kind: kind.clone(),
        name: target.target_name.to_string(),
        namespace: target.target_namespace.to_string(),
        source,
    })?;

    let copy_error = |operation, source| SyncError::Store {
        operation,
        kind: kind.clone(),
        name: target.target_name.to_string(),
        namespace: target.target_namespace.to_string(),
        source,
    };
    let created = match store.create(&copy).await {
        Ok(_) => true,
        Err(e) if e.is_already_exists() => {
            store
                .update(&copy)
                .await
                .map_err(|source| copy_error("update", source))?;
            false
        }
        Err(source) => return Err(copy_error("create", source)),
    };

    set_owner_reference(bind_info, source.meta_mut()).map_err(|source| SyncError::Ownership {
        kind: kind.clone(),
        name: target.source_name.to_string(),
        namespace: target.source_namespace.to_string(),
        source,
    })?;
    store
        .update(&source)
        .await
        .map_err(|source| SyncError::Store {
            operation: "update",
            kind: kind.clone(),
            name: target.source_name.to_string(),
            namespace: target.source_namespace.to_string(),
            source,
        })?;

    metrics::increment_objects_copied(&kind);
    info!(
        %kind,
        source = target.source_name,
        source_namespace = target.source_namespace,
        target = target.target_name,
        target_namespace = target.target_namespace,
        created,
        "Copied object"
    );
    Ok(SyncOutcome::Copied { created })
}
