//! # Registry Resolution
//!
//! Reads the OperandRegistry named by a BindInfo and extracts where the operand
//! lives and which OperandRequests depend on it.

use crate::crd::{OperandRegistry, ReconcileRequest};
use crate::store::{ObjectStore, StoreError};
use tracing::debug;

/// What the registry knows about one operand
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRegistry {
    /// Namespace holding the operand's Secrets and ConfigMaps.
    /// `None` when the operand is not listed or has no namespace.
    pub source_namespace: Option<String>,
    /// OperandRequests recorded by the registry's own controller
    pub consumers: Vec<ReconcileRequest>,
}

/// Load the registry and resolve `operand` in it.
///
/// A missing registry surfaces as [`StoreError::NotFound`].
pub async fn resolve<S: ObjectStore>(
    store: &S,
    name: &str,
    namespace: &str,
    operand: &str,
) -> Result<ResolvedRegistry, StoreError> {
    let registry = store.get::<OperandRegistry>(name, namespace).await?;
    let resolved = resolve_operand(&registry, operand);
    debug!(
        registry = name,
        registry_namespace = namespace,
        operand,
        consumers = resolved.consumers.len(),
        source_namespace = resolved.source_namespace.as_deref().unwrap_or(""),
        "Resolved OperandRegistry"
    );
    Ok(resolved)
}

fn resolve_operand(registry: &OperandRegistry, operand: &str) -> ResolvedRegistry {
    let source_namespace = registry
        .operator(operand)
        .map(|operator| operator.namespace.clone())
        .filter(|ns| !ns.is_empty());
    ResolvedRegistry {
        source_namespace,
        consumers: registry.reconcile_requests(operand).to_vec(),
    }
}
