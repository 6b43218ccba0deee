//! # Kubernetes Store
//!
//! [`ObjectStore`] backed by the Kubernetes API server.

use super::{check_ownership, object_key, ObjectStore, StoreError, StoreResource};
use crate::crd::OperandBindInfo;
use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
use tracing::debug;

/// Object store that reads and writes through `kube::Client`
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: StoreResource>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Map a kube error onto the store taxonomy
fn map_error<K: StoreResource>(
    operation: &'static str,
    name: &str,
    namespace: &str,
    error: kube::Error,
) -> StoreError {
    let kind = K::kind(&()).to_string();
    match error {
        kube::Error::Api(api_err) if api_err.code == 404 => StoreError::NotFound {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
        },
        kube::Error::Api(api_err) if api_err.code == 409 && api_err.reason == "AlreadyExists" => {
            StoreError::AlreadyExists {
                kind,
                name: name.to_string(),
                namespace: namespace.to_string(),
            }
        }
        kube::Error::Api(api_err) if api_err.code == 409 => StoreError::Conflict {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
            message: api_err.message.clone(),
        },
        other => StoreError::Backend {
            operation,
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: StoreResource>(&self, name: &str, namespace: &str) -> Result<K, StoreError> {
        self.api::<K>(namespace)
            .get(name)
            .await
            .map_err(|e| map_error::<K>("get", name, namespace, e))
    }

    async fn create<K: StoreResource>(&self, object: &K) -> Result<K, StoreError> {
        let (name, namespace) = object_key(object, "create")?;
        check_ownership(object, &name, &namespace)?;
        debug!(kind = %K::kind(&()), %name, %namespace, "store.create");
        self.api::<K>(&namespace)
            .create(&PostParams::default(), object)
            .await
            .map_err(|e| map_error::<K>("create", &name, &namespace, e))
    }

    async fn update<K: StoreResource>(&self, object: &K) -> Result<K, StoreError> {
        let (name, namespace) = object_key(object, "update")?;
        check_ownership(object, &name, &namespace)?;
        debug!(kind = %K::kind(&()), %name, %namespace, "store.update");
        self.api::<K>(&namespace)
            .replace(&name, &PostParams::default(), object)
            .await
            .map_err(|e| map_error::<K>("update", &name, &namespace, e))
    }

    async fn update_bind_info_status(
        &self,
        bind_info: &OperandBindInfo,
    ) -> Result<OperandBindInfo, StoreError> {
        let (name, namespace) = object_key(bind_info, "update status of")?;
        let patch = serde_json::json!({
            "status": bind_info.status
        });
        self.api::<OperandBindInfo>(&namespace)
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(|e| map_error::<OperandBindInfo>("update status of", &name, &namespace, e))
    }
}
