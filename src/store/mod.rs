//! # Object Store
//!
//! Read/write access to namespaced Kubernetes objects, passed to the
//! [`crate::controller::reconciler::Reconciler`] at construction.
//!
//! The reconciler's control flow depends on telling "not found", "already
//! exists" and "conflict" apart from every other failure, so implementations
//! must map their native errors onto the matching [`StoreError`] variant.
//!
//! - [`KubeStore`] talks to the API server through `kube::Client`
//! - [`InMemoryStore`] is a deterministic fake used by the test suite

mod kubernetes;
mod memory;

pub use kubernetes::KubeStore;
pub use memory::{InMemoryStore, WriteRecord};

use crate::crd::OperandBindInfo;
use crate::ownership::OwnershipError;
use kube::Resource;
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Any namespaced object the store can hold
pub trait StoreResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> StoreResource for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        name: String,
        namespace: String,
    },

    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: String,
        name: String,
        namespace: String,
    },

    #[error("{kind} {namespace}/{name} was modified concurrently: {message}")]
    Conflict {
        kind: String,
        name: String,
        namespace: String,
        message: String,
    },

    #[error("refusing to write {kind} {namespace}/{name}: {source}")]
    InvalidOwnership {
        kind: String,
        name: String,
        namespace: String,
        #[source]
        source: OwnershipError,
    },

    #[error("failed to {operation} {kind} {namespace}/{name}: {message}")]
    Backend {
        operation: &'static str,
        kind: String,
        name: String,
        namespace: String,
        message: String,
    },
}

impl StoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Name and namespace of an object that is about to be written
pub(crate) fn object_key<K: StoreResource>(
    object: &K,
    operation: &'static str,
) -> Result<(String, String), StoreError> {
    let meta = object.meta();
    match (meta.name.as_deref(), meta.namespace.as_deref()) {
        (Some(name), Some(namespace)) if !name.is_empty() && !namespace.is_empty() => {
            Ok((name.to_string(), namespace.to_string()))
        }
        _ => Err(StoreError::Backend {
            operation,
            kind: K::kind(&()).to_string(),
            name: meta.name.clone().unwrap_or_default(),
            namespace: meta.namespace.clone().unwrap_or_default(),
            message: "object must have a name and a namespace".to_string(),
        }),
    }
}

/// Ownership validation shared by every implementation
pub(crate) fn check_ownership<K: StoreResource>(
    object: &K,
    name: &str,
    namespace: &str,
) -> Result<(), StoreError> {
    crate::ownership::validate_owner_edges(object.meta()).map_err(|source| {
        StoreError::InvalidOwnership {
            kind: K::kind(&()).to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            source,
        }
    })
}

/// Strongly consistent, per-key object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object; [`StoreError::NotFound`] when it does not exist
    async fn get<K: StoreResource>(&self, name: &str, namespace: &str) -> Result<K, StoreError>;

    /// Create an object; [`StoreError::AlreadyExists`] when the name is taken
    async fn create<K: StoreResource>(&self, object: &K) -> Result<K, StoreError>;

    /// Replace an object. Objects without a resourceVersion are written
    /// unconditionally; a stale resourceVersion yields [`StoreError::Conflict`].
    async fn update<K: StoreResource>(&self, object: &K) -> Result<K, StoreError>;

    /// Write the status subresource of an OperandBindInfo
    async fn update_bind_info_status(
        &self,
        bind_info: &OperandBindInfo,
    ) -> Result<OperandBindInfo, StoreError>;
}

#[async_trait]
impl<T: ObjectStore> ObjectStore for Arc<T> {
    async fn get<K: StoreResource>(&self, name: &str, namespace: &str) -> Result<K, StoreError> {
        (**self).get(name, namespace).await
    }

    async fn create<K: StoreResource>(&self, object: &K) -> Result<K, StoreError> {
        (**self).create(object).await
    }

    async fn update<K: StoreResource>(&self, object: &K) -> Result<K, StoreError> {
        (**self).update(object).await
    }

    async fn update_bind_info_status(
        &self,
        bind_info: &OperandBindInfo,
    ) -> Result<OperandBindInfo, StoreError> {
        (**self).update_bind_info_status(bind_info).await
    }
}
