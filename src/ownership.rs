//! # Ownership Edges
//!
//! Owner references expressed as explicit [`OwnerEdge`] values.
//!
//! Two kinds of edge are written by the controller:
//!
//! - **controlling**: the copy in a consumer namespace is controlled by the
//!   OperandRequest, so deleting the request garbage-collects the copy
//! - **non-controlling**: the source object in the operand namespace points
//!   back at the OperandBindInfo for traceability
//!
//! An object may carry any number of non-controlling edges but at most one
//! controlling edge. [`validate_owner_edges`] enforces that and every
//! [`crate::store::ObjectStore`] implementation calls it before writing.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::Resource;
use thiserror::Error;

/// A directed ownership relation from an object to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerEdge {
    pub owner_api_version: String,
    pub owner_kind: String,
    pub owner_name: String,
    pub owner_uid: String,
    /// Whether the owner is the object's managing controller
    pub controlling: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("{kind} has no name and cannot own other objects")]
    MissingName { kind: String },

    #[error("{kind} {name} has no uid; it must be read from the API server before it can own other objects")]
    MissingUid { kind: String, name: String },

    #[error("{kind} {owner_namespace}/{name} cannot own an object in namespace {object_namespace}")]
    CrossNamespace {
        kind: String,
        name: String,
        owner_namespace: String,
        object_namespace: String,
    },

    #[error("object is already controlled by {existing_kind} {existing_name}")]
    AlreadyControlled {
        existing_kind: String,
        existing_name: String,
    },

    #[error("object has {count} controlling owners, at most one is allowed")]
    MultipleControllers { count: usize },
}

impl OwnerEdge {
    /// Build an edge pointing at `owner`
    pub fn to<K>(owner: &K, controlling: bool) -> Result<Self, OwnershipError>
    where
        K: Resource<DynamicType = ()>,
    {
        let kind = K::kind(&()).to_string();
        let meta = owner.meta();
        let name = meta
            .name
            .clone()
            .ok_or_else(|| OwnershipError::MissingName { kind: kind.clone() })?;
        let uid = meta.uid.clone().ok_or_else(|| OwnershipError::MissingUid {
            kind: kind.clone(),
            name: name.clone(),
        })?;

        Ok(Self {
            owner_api_version: K::api_version(&()).to_string(),
            owner_kind: kind,
            owner_name: name,
            owner_uid: uid,
            controlling,
        })
    }

    #[must_use]
    pub fn to_owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: self.owner_api_version.clone(),
            kind: self.owner_kind.clone(),
            name: self.owner_name.clone(),
            uid: self.owner_uid.clone(),
            controller: Some(self.controlling),
            block_owner_deletion: Some(self.controlling),
        }
    }

    fn same_owner(&self, reference: &OwnerReference) -> bool {
        reference.uid == self.owner_uid
    }
}

impl From<&OwnerReference> for OwnerEdge {
    fn from(reference: &OwnerReference) -> Self {
        Self {
            owner_api_version: reference.api_version.clone(),
            owner_kind: reference.kind.clone(),
            owner_name: reference.name.clone(),
            owner_uid: reference.uid.clone(),
            controlling: reference.controller.unwrap_or(false),
        }
    }
}

/// All ownership edges recorded on an object
#[must_use]
pub fn owner_edges(meta: &ObjectMeta) -> Vec<OwnerEdge> {
    meta.owner_references
        .iter()
        .flatten()
        .map(OwnerEdge::from)
        .collect()
}

/// The controlling edge of an object, if it has one
#[must_use]
pub fn controller_edge(meta: &ObjectMeta) -> Option<OwnerEdge> {
    owner_edges(meta).into_iter().find(|edge| edge.controlling)
}

/// Reject objects with more than one controlling owner
pub fn validate_owner_edges(meta: &ObjectMeta) -> Result<(), OwnershipError> {
    let count = owner_edges(meta)
        .iter()
        .filter(|edge| edge.controlling)
        .count();
    if count > 1 {
        return Err(OwnershipError::MultipleControllers { count });
    }
    Ok(())
}

/// Make `owner` the controller of the object described by `meta`.
///
/// An existing edge to the same owner is replaced. A different existing
/// controller is an error.
pub fn set_controller_reference<K>(owner: &K, meta: &mut ObjectMeta) -> Result<(), OwnershipError>
where
    K: Resource<DynamicType = ()>,
{
    let edge = OwnerEdge::to(owner, true)?;
    ensure_same_namespace(owner, &edge, meta)?;

    if let Some(existing) = controller_edge(meta) {
        if existing.owner_uid != edge.owner_uid {
            return Err(OwnershipError::AlreadyControlled {
                existing_kind: existing.owner_kind,
                existing_name: existing.owner_name,
            });
        }
    }

    upsert(meta, &edge);
    Ok(())
}

/// Record a non-controlling edge from the object to `owner`.
///
/// If the object already points at `owner`, that edge keeps its controlling
/// flag. Other owners are left untouched.
pub fn set_owner_reference<K>(owner: &K, meta: &mut ObjectMeta) -> Result<(), OwnershipError>
where
    K: Resource<DynamicType = ()>,
{
    let mut edge = OwnerEdge::to(owner, false)?;
    ensure_same_namespace(owner, &edge, meta)?;

    if let Some(existing) = owner_edges(meta).into_iter().find(|e| e.owner_uid == edge.owner_uid) {
        edge.controlling = existing.controlling;
    }

    upsert(meta, &edge);
    Ok(())
}

fn ensure_same_namespace<K>(owner: &K, edge: &OwnerEdge, meta: &ObjectMeta) -> Result<(), OwnershipError>
where
    K: Resource<DynamicType = ()>,
{
    // Cluster-scoped owners may own anything
    let (Some(owner_namespace), Some(object_namespace)) =
        (owner.meta().namespace.as_deref(), meta.namespace.as_deref())
    else {
        return Ok(());
    };
    if owner_namespace != object_namespace {
        return Err(OwnershipError::CrossNamespace {
            kind: edge.owner_kind.clone(),
            name: edge.owner_name.clone(),
            owner_namespace: owner_namespace.to_string(),
            object_namespace: object_namespace.to_string(),
        });
    }
    Ok(())
}

fn upsert(meta: &mut ObjectMeta, edge: &OwnerEdge) {
    let references = meta.owner_references.get_or_insert_with(Vec::new);
    let reference = edge.to_owner_reference();
    match references.iter_mut().find(|r| edge.same_owner(r)) {
        Some(existing) => *existing = reference,
        None => references.push(reference),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{OperandBindInfo, OperandBindInfoSpec, OperandRequest, OperandRequestSpec};

    fn request(name: &str, namespace: &str, uid: &str) -> OperandRequest {
        let mut request = OperandRequest::new(name, OperandRequestSpec::default());
        request.metadata.namespace = Some(namespace.to_string());
        request.metadata.uid = Some(uid.to_string());
        request
    }

    fn bind_info(namespace: &str, uid: &str) -> OperandBindInfo {
        let mut bind_info = OperandBindInfo::new("bindinfo", OperandBindInfoSpec::default());
        bind_info.metadata.namespace = Some(namespace.to_string());
        bind_info.metadata.uid = Some(uid.to_string());
        bind_info
    }

    fn meta_in(namespace: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some("copy".to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_set_controller_reference() {
        let owner = request("req", "team-a", "uid-1");
        let mut meta = meta_in("team-a");
        set_controller_reference(&owner, &mut meta).unwrap();

        let edge = controller_edge(&meta).unwrap();
        assert_eq!(edge.owner_kind, "OperandRequest");
        assert_eq!(edge.owner_api_version, "operator.ibm.com/v1alpha1");
        assert_eq!(edge.owner_name, "req");
        assert_eq!(edge.owner_uid, "uid-1");
        assert_eq!(
            meta.owner_references.as_ref().unwrap()[0].block_owner_deletion,
            Some(true)
        );
    }

    #[test]
    fn test_set_controller_reference_is_idempotent() {
        let owner = request("req", "team-a", "uid-1");
        let mut meta = meta_in("team-a");
        set_controller_reference(&owner, &mut meta).unwrap();
        set_controller_reference(&owner, &mut meta).unwrap();
        assert_eq!(owner_edges(&meta).len(), 1);
    }

    #[test]
    fn test_set_controller_reference_rejects_second_controller() {
        let mut meta = meta_in("team-a");
        set_controller_reference(&request("req-1", "team-a", "uid-1"), &mut meta).unwrap();
        let err = set_controller_reference(&request("req-2", "team-a", "uid-2"), &mut meta)
            .unwrap_err();
        assert_eq!(
            err,
            OwnershipError::AlreadyControlled {
                existing_kind: "OperandRequest".to_string(),
                existing_name: "req-1".to_string(),
            }
        );
    }

    #[test]
    fn test_set_controller_reference_requires_uid() {
        let mut owner = request("req", "team-a", "uid-1");
        owner.metadata.uid = None;
        let err = set_controller_reference(&owner, &mut meta_in("team-a")).unwrap_err();
        assert!(matches!(err, OwnershipError::MissingUid { .. }));
    }

    #[test]
    fn test_cross_namespace_owner_is_rejected() {
        let owner = request("req", "team-a", "uid-1");
        let err = set_controller_reference(&owner, &mut meta_in("team-b")).unwrap_err();
        assert!(matches!(err, OwnershipError::CrossNamespace { .. }));
    }

    #[test]
    fn test_owner_references_from_several_bind_infos_coexist() {
        let mut meta = meta_in("operands");
        set_owner_reference(&bind_info("operands", "bi-1"), &mut meta).unwrap();
        set_owner_reference(&bind_info("operands", "bi-2"), &mut meta).unwrap();
        set_owner_reference(&bind_info("operands", "bi-1"), &mut meta).unwrap();

        let edges = owner_edges(&meta);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|edge| !edge.controlling));
        validate_owner_edges(&meta).unwrap();
    }

    #[test]
    fn test_owner_reference_keeps_existing_controlling_flag() {
        let owner = bind_info("operands", "bi-1");
        let mut meta = meta_in("operands");
        meta.owner_references = Some(vec![OwnerEdge::to(&owner, true)
            .unwrap()
            .to_owner_reference()]);
        set_owner_reference(&owner, &mut meta).unwrap();
        assert!(controller_edge(&meta).is_some());
    }

    #[test]
    fn test_validate_rejects_multiple_controllers() {
        let mut meta = meta_in("team-a");
        meta.owner_references = Some(vec![
            OwnerEdge::to(&request("a", "team-a", "uid-a"), true)
                .unwrap()
                .to_owner_reference(),
            OwnerEdge::to(&request("b", "team-a", "uid-b"), true)
                .unwrap()
                .to_owner_reference(),
        ]);
        assert_eq!(
            validate_owner_edges(&meta),
            Err(OwnershipError::MultipleControllers { count: 2 })
        );
    }
}
