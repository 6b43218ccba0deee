//! # OperandBindInfo
//!
//! Declares which Secrets and ConfigMaps of an operand may be shared with the
//! namespaces that requested that operand.

use crate::crd::Binding;
use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// OperandBindInfo Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: operator.ibm.com/v1alpha1
/// kind: OperandBindInfo
/// metadata:
///   name: mongodb-bindinfo
///   namespace: ibm-common-services
/// spec:
///   operand: ibm-mongodb-operator
///   registry: common-service
///   bindings:
///     - scope: public
///       secret: mongodb-admin
///       configmap: mongodb-endpoint
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "OperandBindInfo",
    group = "operator.ibm.com",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::OperandBindInfoStatus",
    shortname = "opbi",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Operand", "type":"string", "jsonPath":".spec.operand"}, {"name":"Registry", "type":"string", "jsonPath":".spec.registry"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OperandBindInfoSpec {
    /// Name of the operand inside the OperandRegistry
    pub operand: String,
    /// Name of the OperandRegistry that lists the operand
    pub registry: String,
    /// Namespace of the OperandRegistry
    /// Defaults to the namespace of the OperandBindInfo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_namespace: Option<String>,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Objects offered to requesting namespaces, in declaration order
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// Outcome of the most recent reconcile pass
///
/// Recomputed on every pass; no value is sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum BindInfoPhase {
    /// Status initialised, nothing synchronised yet
    #[serde(rename = "Initialized")]
    Init,
    /// Every eligible object was copied
    Completed,
    /// At least one copy failed
    Failed,
}

impl BindInfoPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BindInfoPhase::Init => "Initialized",
            BindInfoPhase::Completed => "Completed",
            BindInfoPhase::Failed => "Failed",
        }
    }
}

impl fmt::Display for BindInfoPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl JsonSchema for BindInfoPhase {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("BindInfoPhase")
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        // Structural schema for the CRD: plain string enum, no anyOf
        let schema_value = serde_json::json!({
            "type": "string",
            "enum": ["Initialized", "Completed", "Failed"],
            "description": "Outcome of the most recent reconcile pass."
        });
        Schema::try_from(schema_value).expect("Failed to create Schema for BindInfoPhase")
    }
}

/// Status of the OperandBindInfo resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperandBindInfoStatus {
    /// Current phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<BindInfoPhase>,
    /// Namespaces of the OperandRequests seen by the last completed or failed pass
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_namespaces: Vec<String>,
}

impl OperandBindInfoStatus {
    fn is_empty(&self) -> bool {
        self.phase.is_none() && self.request_namespaces.is_empty()
    }
}

impl OperandBindInfo {
    /// Namespace of the referenced OperandRegistry, after defaulting
    #[must_use]
    pub fn registry_namespace(&self) -> &str {
        match self.spec.registry_namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ns,
            _ => self.metadata.namespace.as_deref().unwrap_or_default(),
        }
    }

    /// Label stamped on the BindInfo so the registry controller can find it
    #[must_use]
    pub fn registry_label_key(&self) -> String {
        format!("{}.{}/registry", self.registry_namespace(), self.spec.registry)
    }

    /// Fill in defaulted spec fields. Returns true when the spec changed.
    pub fn set_defaults(&mut self) -> bool {
        let has_registry_namespace = self
            .spec
            .registry_namespace
            .as_deref()
            .is_some_and(|ns| !ns.is_empty());
        if has_registry_namespace {
            return false;
        }
        match self.metadata.namespace.clone() {
            Some(ns) => {
                self.spec.registry_namespace = Some(ns);
                true
            }
            None => false,
        }
    }

    /// Stamp the registry label. Returns true when the labels changed.
    pub fn add_registry_label(&mut self) -> bool {
        let key = self.registry_label_key();
        let labels = self.metadata.labels.get_or_insert_with(Default::default);
        if labels.get(&key).map(String::as_str) == Some("true") {
            return false;
        }
        labels.insert(key, "true".to_string());
        true
    }

    /// Set the initial phase on a BindInfo that has never been reconciled.
    /// Returns true when the status changed.
    pub fn init_status(&mut self) -> bool {
        let status = self.status.get_or_insert_with(Default::default);
        if !status.is_empty() {
            return false;
        }
        status.phase = Some(BindInfoPhase::Init);
        true
    }

    /// Current phase, if any
    #[must_use]
    pub fn phase(&self) -> Option<BindInfoPhase> {
        self.status.as_ref().and_then(|s| s.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;

    fn bind_info(registry_namespace: Option<&str>) -> OperandBindInfo {
        let mut bind_info = OperandBindInfo::new(
            "mongodb-bindinfo",
            OperandBindInfoSpec {
                operand: "mongodb".to_string(),
                registry: "common-service".to_string(),
                registry_namespace: registry_namespace.map(str::to_string),
                ..Default::default()
            },
        );
        bind_info.metadata = ObjectMeta {
            name: Some("mongodb-bindinfo".to_string()),
            namespace: Some("operands".to_string()),
            ..Default::default()
        };
        bind_info
    }

    #[test]
    fn test_set_defaults_fills_registry_namespace() {
        let mut bi = bind_info(None);
        assert!(bi.set_defaults());
        assert_eq!(bi.spec.registry_namespace.as_deref(), Some("operands"));
        assert!(!bi.set_defaults(), "second call must be a no-op");
    }

    #[test]
    fn test_set_defaults_treats_empty_namespace_as_absent() {
        let mut bi = bind_info(Some(""));
        assert!(bi.set_defaults());
        assert_eq!(bi.registry_namespace(), "operands");
    }

    #[test]
    fn test_set_defaults_keeps_explicit_namespace() {
        let mut bi = bind_info(Some("registries"));
        assert!(!bi.set_defaults());
        assert_eq!(bi.registry_namespace(), "registries");
    }

    #[test]
    fn test_add_registry_label() {
        let mut bi = bind_info(Some("registries"));
        assert!(bi.add_registry_label());
        let labels = bi.metadata.labels.as_ref().unwrap();
        assert_eq!(
            labels.get("registries.common-service/registry").map(String::as_str),
            Some("true")
        );
        assert!(!bi.add_registry_label());
    }

    #[test]
    fn test_init_status_only_on_empty_status() {
        let mut bi = bind_info(None);
        assert!(bi.init_status());
        assert_eq!(bi.phase(), Some(BindInfoPhase::Init));

        bi.status.as_mut().unwrap().phase = Some(BindInfoPhase::Completed);
        assert!(!bi.init_status());
        assert_eq!(bi.phase(), Some(BindInfoPhase::Completed));
    }

    #[test]
    fn test_phase_serializes_init_as_initialized() {
        assert_eq!(
            serde_json::to_string(&BindInfoPhase::Init).unwrap(),
            "\"Initialized\""
        );
        let phase: BindInfoPhase = serde_json::from_str("\"Failed\"").unwrap();
        assert_eq!(phase, BindInfoPhase::Failed);
    }
}
