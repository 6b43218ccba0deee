//! Common test utilities for reconciler integration tests
//!
//! Builds a small cluster in an [`InMemoryStore`]:
//!
//! - registry `common-service` in `operands`, placing operand `mongodb` in `operands`
//! - OperandBindInfo `mongodb-bindinfo` in `operands` sharing Secret
//!   `mongodb-admin` and ConfigMap `mongodb-endpoint`
//! - one OperandRequest `req` per consumer namespace

#![allow(dead_code, reason = "each test binary uses a different subset")]

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use operand_bindinfo_controller::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const OPERAND_NAMESPACE: &str = "operands";
pub const REGISTRY: &str = "common-service";
pub const OPERAND: &str = "mongodb";
pub const BIND_INFO: &str = "mongodb-bindinfo";
pub const SOURCE_SECRET: &str = "mongodb-admin";
pub const SOURCE_CONFIGMAP: &str = "mongodb-endpoint";
pub const REQUEST: &str = "req";

pub type TestReconciler = Reconciler<Arc<InMemoryStore>, Arc<RecordingEventSink>>;

/// A store, an event sink and a reconciler wired to both
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub events: Arc<RecordingEventSink>,
    pub reconciler: TestReconciler,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let events = Arc::new(RecordingEventSink::new());
        let reconciler = Reconciler::new(Arc::clone(&store), Arc::clone(&events));
        Self {
            store,
            events,
            reconciler,
        }
    }

    /// Registry, BindInfo, sources and one request per consumer namespace
    pub fn seeded(consumers: &[&str]) -> Self {
        let harness = Self::new();
        harness.store.insert(registry(OPERAND_NAMESPACE, consumers));
        harness.store.insert(bind_info(vec![public_binding(
            Some(SOURCE_SECRET),
            Some(SOURCE_CONFIGMAP),
        )]));
        harness.store.insert(secret(SOURCE_SECRET, OPERAND_NAMESPACE, "s3cr3t"));
        harness
            .store
            .insert(config_map(SOURCE_CONFIGMAP, OPERAND_NAMESPACE, "mongodb:27017"));
        for namespace in consumers {
            harness.store.insert(request(
                namespace,
                vec![public_binding(Some("db-admin"), Some("db-endpoint"))],
            ));
        }
        harness
    }

    pub async fn reconcile(&self) -> Result<ReconcileOutcome, ReconcilerError> {
        self.reconciler.reconcile(BIND_INFO, OPERAND_NAMESPACE).await
    }

    pub fn bind_info(&self) -> OperandBindInfo {
        self.store
            .lookup(BIND_INFO, OPERAND_NAMESPACE)
            .expect("bind info is seeded")
    }

    pub fn phase(&self) -> Option<BindInfoPhase> {
        self.bind_info().phase()
    }

    pub fn secret(&self, name: &str, namespace: &str) -> Option<Secret> {
        self.store.lookup(name, namespace)
    }

    pub fn config_map(&self, name: &str, namespace: &str) -> Option<ConfigMap> {
        self.store.lookup(name, namespace)
    }
}

fn meta(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

pub fn public_binding(secret: Option<&str>, configmap: Option<&str>) -> Binding {
    Binding {
        scope: Scope::Public,
        secret: secret.map(str::to_string),
        configmap: configmap.map(str::to_string),
    }
}

pub fn private_binding(secret: Option<&str>, configmap: Option<&str>) -> Binding {
    Binding {
        scope: Scope::Private,
        ..public_binding(secret, configmap)
    }
}

/// Registry placing [`OPERAND`] in `operand_namespace`, requested from `consumers`
pub fn registry(operand_namespace: &str, consumers: &[&str]) -> OperandRegistry {
    let mut registry = OperandRegistry::new(
        REGISTRY,
        OperandRegistrySpec {
            operators: vec![Operator {
                name: OPERAND.to_string(),
                namespace: operand_namespace.to_string(),
                ..Default::default()
            }],
        },
    );
    registry.metadata = meta(REGISTRY, OPERAND_NAMESPACE);

    let mut operators_status = BTreeMap::new();
    operators_status.insert(
        OPERAND.to_string(),
        OperatorStatus {
            reconcile_requests: consumers
                .iter()
                .map(|namespace| ReconcileRequest::new(REQUEST, *namespace))
                .collect(),
        },
    );
    registry.status = Some(OperandRegistryStatus { operators_status });
    registry
}

pub fn bind_info(bindings: Vec<Binding>) -> OperandBindInfo {
    let mut bind_info = OperandBindInfo::new(
        BIND_INFO,
        OperandBindInfoSpec {
            operand: OPERAND.to_string(),
            registry: REGISTRY.to_string(),
            bindings,
            ..Default::default()
        },
    );
    bind_info.metadata = meta(BIND_INFO, OPERAND_NAMESPACE);
    bind_info
}

pub fn request(namespace: &str, bindings: Vec<Binding>) -> OperandRequest {
    let mut request = OperandRequest::new(
        REQUEST,
        OperandRequestSpec {
            requests: vec![Request {
                registry: REGISTRY.to_string(),
                registry_namespace: Some(OPERAND_NAMESPACE.to_string()),
                operands: vec![Operand {
                    name: OPERAND.to_string(),
                    bindings,
                }],
                ..Default::default()
            }],
        },
    );
    request.metadata = meta(REQUEST, namespace);
    request
}

pub fn secret(name: &str, namespace: &str, password: &str) -> Secret {
    let mut metadata = meta(name, namespace);
    metadata.labels = Some(
        [("app".to_string(), "mongodb".to_string())]
            .into_iter()
            .collect(),
    );
    metadata.annotations = Some(
        [("internal/checksum".to_string(), "abc".to_string())]
            .into_iter()
            .collect(),
    );
    Secret {
        metadata,
        type_: Some("Opaque".to_string()),
        data: Some(
            [(
                "password".to_string(),
                ByteString(password.as_bytes().to_vec()),
            )]
            .into_iter()
            .collect(),
        ),
        ..Default::default()
    }
}

pub fn config_map(name: &str, namespace: &str, endpoint: &str) -> ConfigMap {
    let mut metadata = meta(name, namespace);
    metadata.labels = Some(
        [("app".to_string(), "mongodb".to_string())]
            .into_iter()
            .collect(),
    );
    ConfigMap {
        metadata,
        data: Some(
            [("endpoint".to_string(), endpoint.to_string())]
                .into_iter()
                .collect(),
        ),
        ..Default::default()
    }
}

pub fn password(secret: &Secret) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get("password"))
        .map(|value| String::from_utf8_lossy(&value.0).into_owned())
}

pub fn endpoint(config_map: &ConfigMap) -> Option<String> {
    config_map
        .data
        .as_ref()
        .and_then(|data| data.get("endpoint"))
        .cloned()
}
