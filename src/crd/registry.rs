//! # OperandRegistry
//!
//! Catalog of operands. The controller only reads it: the namespace each
//! operand runs in comes from the spec, and the OperandRequests that asked for
//! the operand come from the status, which the registry's own controller keeps
//! up to date.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// OperandRegistry Custom Resource Definition
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "OperandRegistry",
    group = "operator.ibm.com",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::OperandRegistryStatus",
    shortname = "opreg"
)]
#[serde(rename_all = "camelCase")]
pub struct OperandRegistrySpec {
    /// Operators offered by this registry
    #[serde(default)]
    pub operators: Vec<Operator>,
}

/// One operand entry of a registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    /// Unique name of the operand within the registry
    pub name: String,
    /// Namespace the operand runs in; its shareable objects live here
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Status of the OperandRegistry resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperandRegistryStatus {
    /// Per-operand bookkeeping, keyed by operand name
    #[serde(default)]
    pub operators_status: BTreeMap<String, OperatorStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperatorStatus {
    /// OperandRequests that currently depend on the operand
    #[serde(default)]
    pub reconcile_requests: Vec<ReconcileRequest>,
}

/// Location of an OperandRequest
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRequest {
    pub name: String,
    pub namespace: String,
}

impl ReconcileRequest {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl OperandRegistry {
    /// Look up an operand by name
    #[must_use]
    pub fn operator(&self, name: &str) -> Option<&Operator> {
        self.spec.operators.iter().find(|op| op.name == name)
    }

    /// OperandRequests recorded for an operand; empty when none are known
    #[must_use]
    pub fn reconcile_requests(&self, operand: &str) -> &[ReconcileRequest] {
        self.status
            .as_ref()
            .and_then(|s| s.operators_status.get(operand))
            .map(|s| s.reconcile_requests.as_slice())
            .unwrap_or_default()
    }
}
