//! # OperandRequest
//!
//! A consumer's declaration of the operands it depends on, with the names it
//! wants the shared objects to have in its own namespace.

use crate::crd::Binding;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// OperandRequest Custom Resource Definition
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "OperandRequest",
    group = "operator.ibm.com",
    version = "v1alpha1",
    namespaced,
    shortname = "opreq"
)]
#[serde(rename_all = "camelCase")]
pub struct OperandRequestSpec {
    /// Requested operands, grouped by registry
    #[serde(default)]
    pub requests: Vec<Request>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// OperandRegistry name
    pub registry: String,
    /// OperandRegistry namespace
    /// Defaults to the namespace of the OperandRequest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub operands: Vec<Operand>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Operand {
    /// Operand name, as listed in the registry
    pub name: String,
    /// Per-binding overrides; the names are the ones wanted in this namespace
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

impl Request {
    /// Whether this entry points at the given registry.
    ///
    /// `request_namespace` is the namespace of the owning OperandRequest and
    /// stands in for an unset `registryNamespace`.
    #[must_use]
    pub fn targets_registry(&self, name: &str, namespace: &str, request_namespace: &str) -> bool {
        let effective_namespace = match self.registry_namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ns,
            _ => request_namespace,
        };
        self.registry == name && effective_namespace == namespace
    }
}
