//! # In-Memory Store
//!
//! Deterministic [`ObjectStore`] for tests. Objects are kept serialized, keyed
//! by `(kind, namespace, name)`, and behave like the API server in the ways
//! the reconciler cares about:
//!
//! - `create` of an existing name fails with `AlreadyExists`
//! - `update` of a missing object fails with `NotFound`
//! - `update` carrying a stale resourceVersion fails with `Conflict`
//! - `update` never touches the status; `update_bind_info_status` only
//!   touches the status
//! - every write assigns a new resourceVersion, `create` assigns a uid
//!
//! Writes to a given kind in a given namespace can be made to fail with
//! [`InMemoryStore::fail_writes`], and updates can be made to lose a race
//! against another writer with [`InMemoryStore::conflict_updates`].

use super::{check_ownership, object_key, ObjectStore, StoreError, StoreResource};
use crate::crd::OperandBindInfo;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

type ObjectKey = (String, String, String);

/// A write that reached the store, successful or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub operation: &'static str,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<ObjectKey, Value>,
    next_version: u64,
    next_uid: u64,
    failing: BTreeSet<(String, String)>,
    conflicting: BTreeSet<(String, String)>,
    writes: Vec<WriteRecord>,
}

impl Inner {
    fn next_resource_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }

    fn next_uid(&mut self) -> String {
        self.next_uid += 1;
        format!("00000000-0000-0000-0000-{:012}", self.next_uid)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

fn key<K: StoreResource>(name: &str, namespace: &str) -> ObjectKey {
    (K::kind(&()).to_string(), namespace.to_string(), name.to_string())
}

fn encode<K: StoreResource>(object: &K, name: &str, namespace: &str) -> Result<Value, StoreError> {
    serde_json::to_value(object).map_err(|e| StoreError::Backend {
        operation: "encode",
        kind: K::kind(&()).to_string(),
        name: name.to_string(),
        namespace: namespace.to_string(),
        message: e.to_string(),
    })
}

fn decode<K: StoreResource>(value: &Value, name: &str, namespace: &str) -> Result<K, StoreError> {
    serde_json::from_value(value.clone()).map_err(|e| StoreError::Backend {
        operation: "decode",
        kind: K::kind(&()).to_string(),
        name: name.to_string(),
        namespace: namespace.to_string(),
        message: e.to_string(),
    })
}

fn resource_version(value: &Value) -> Option<&str> {
    value.pointer("/metadata/resourceVersion").and_then(Value::as_str)
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A test that panicked while holding the lock leaves consistent data behind
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Seed an object, replacing any existing one. A uid is assigned when the
    /// object has none. Returns the object as stored.
    ///
    /// # Panics
    ///
    /// Panics when the object has no name/namespace or cannot be serialized.
    pub fn insert<K: StoreResource>(&self, mut object: K) -> K {
        let (name, namespace) =
            object_key(&object, "insert").expect("seeded objects need a name and namespace");
        let mut inner = self.lock();
        if object.meta().uid.is_none() {
            object.meta_mut().uid = Some(inner.next_uid());
        }
        object.meta_mut().resource_version = Some(inner.next_resource_version());
        let value = encode(&object, &name, &namespace).expect("seeded objects must serialize");
        inner.objects.insert(key::<K>(&name, &namespace), value);
        object
    }

    /// Read an object without going through the async trait
    #[must_use]
    pub fn lookup<K: StoreResource>(&self, name: &str, namespace: &str) -> Option<K> {
        let inner = self.lock();
        inner
            .objects
            .get(&key::<K>(name, namespace))
            .and_then(|value| decode(value, name, namespace).ok())
    }

    /// Make every create/update of `kind` in `namespace` fail
    pub fn fail_writes(&self, kind: &str, namespace: &str) {
        self.lock()
            .failing
            .insert((kind.to_string(), namespace.to_string()));
    }

    /// Make every update of `kind` in `namespace` fail with `Conflict`, as if
    /// another writer got there first
    pub fn conflict_updates(&self, kind: &str, namespace: &str) {
        self.lock()
            .conflicting
            .insert((kind.to_string(), namespace.to_string()));
    }

    /// Undo every [`InMemoryStore::fail_writes`] and
    /// [`InMemoryStore::conflict_updates`]
    pub fn clear_failures(&self) {
        let mut inner = self.lock();
        inner.failing.clear();
        inner.conflicting.clear();
    }

    /// Every write attempted so far, in order
    #[must_use]
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.lock().writes.clone()
    }

    /// Writes of one kind
    #[must_use]
    pub fn writes_of(&self, kind: &str) -> Vec<WriteRecord> {
        self.writes()
            .into_iter()
            .filter(|w| w.kind == kind)
            .collect()
    }

    fn record_write(
        inner: &mut Inner,
        operation: &'static str,
        kind: &str,
        name: &str,
        namespace: &str,
    ) -> Result<(), StoreError> {
        inner.writes.push(WriteRecord {
            operation,
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        if inner
            .failing
            .contains(&(kind.to_string(), namespace.to_string()))
        {
            return Err(StoreError::Backend {
                operation,
                kind: kind.to_string(),
                name: name.to_string(),
                namespace: namespace.to_string(),
                message: "injected write failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get<K: StoreResource>(&self, name: &str, namespace: &str) -> Result<K, StoreError> {
        let inner = self.lock();
        match inner.objects.get(&key::<K>(name, namespace)) {
            Some(value) => decode(value, name, namespace),
            None => Err(StoreError::NotFound {
                kind: K::kind(&()).to_string(),
                name: name.to_string(),
                namespace: namespace.to_string(),
            }),
        }
    }

    async fn create<K: StoreResource>(&self, object: &K) -> Result<K, StoreError> {
        let (name, namespace) = object_key(object, "create")?;
        let kind = K::kind(&()).to_string();
        let mut inner = self.lock();
        Self::record_write(&mut inner, "create", &kind, &name, &namespace)?;
        check_ownership(object, &name, &namespace)?;

        let slot = key::<K>(&name, &namespace);
        if inner.objects.contains_key(&slot) {
            return Err(StoreError::AlreadyExists {
                kind,
                name,
                namespace,
            });
        }

        let mut created = object.clone();
        created.meta_mut().uid = Some(inner.next_uid());
        created.meta_mut().resource_version = Some(inner.next_resource_version());
        let value = encode(&created, &name, &namespace)?;
        inner.objects.insert(slot, value);
        Ok(created)
    }

    async fn update<K: StoreResource>(&self, object: &K) -> Result<K, StoreError> {
        let (name, namespace) = object_key(object, "update")?;
        let kind = K::kind(&()).to_string();
        let mut inner = self.lock();
        Self::record_write(&mut inner, "update", &kind, &name, &namespace)?;
        check_ownership(object, &name, &namespace)?;

        let slot = key::<K>(&name, &namespace);
        let Some(stored) = inner.objects.get(&slot).cloned() else {
            return Err(StoreError::NotFound {
                kind,
                name,
                namespace,
            });
        };

        if inner.conflicting.contains(&(kind.clone(), namespace.clone())) {
            return Err(StoreError::Conflict {
                kind,
                name,
                namespace,
                message: "the object has been modified by another writer".to_string(),
            });
        }

        if let Some(expected) = object.meta().resource_version.as_deref() {
            if resource_version(&stored) != Some(expected) {
                return Err(StoreError::Conflict {
                    kind,
                    name,
                    namespace,
                    message: format!(
                        "resourceVersion {expected} is stale, current is {}",
                        resource_version(&stored).unwrap_or("unknown")
                    ),
                });
            }
        }

        let mut updated = object.clone();
        // uid is immutable once assigned
        updated.meta_mut().uid = stored
            .pointer("/metadata/uid")
            .and_then(Value::as_str)
            .map(str::to_string);
        updated.meta_mut().resource_version = Some(inner.next_resource_version());

        let mut value = encode(&updated, &name, &namespace)?;
        if let Some(map) = value.as_object_mut() {
            match stored.get("status") {
                Some(status) => {
                    map.insert("status".to_string(), status.clone());
                }
                None => {
                    map.remove("status");
                }
            }
        }
        let result = decode(&value, &name, &namespace)?;
        inner.objects.insert(slot, value);
        Ok(result)
    }

    async fn update_bind_info_status(
        &self,
        bind_info: &OperandBindInfo,
    ) -> Result<OperandBindInfo, StoreError> {
        let (name, namespace) = object_key(bind_info, "update status of")?;
        let kind = "OperandBindInfo";
        let mut inner = self.lock();
        Self::record_write(&mut inner, "update status of", kind, &name, &namespace)?;

        let slot = key::<OperandBindInfo>(&name, &namespace);
        let Some(mut stored) = inner.objects.get(&slot).cloned() else {
            return Err(StoreError::NotFound {
                kind: kind.to_string(),
                name,
                namespace,
            });
        };

        let status = serde_json::to_value(&bind_info.status).map_err(|e| StoreError::Backend {
            operation: "encode",
            kind: kind.to_string(),
            name: name.clone(),
            namespace: namespace.clone(),
            message: e.to_string(),
        })?;
        let version = inner.next_resource_version();
        if let Some(map) = stored.as_object_mut() {
            map.insert("status".to_string(), status);
            if let Some(metadata) = map.get_mut("metadata").and_then(Value::as_object_mut) {
                metadata.insert("resourceVersion".to_string(), Value::String(version));
            }
        }
        let result = decode(&stored, &name, &namespace)?;
        inner.objects.insert(slot, stored);
        Ok(result)
    }
}
