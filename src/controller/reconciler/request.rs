//! # Request Binding Extraction
//!
//! Finds the names a consumer wants its copies to carry.

use crate::crd::OperandRequest;

/// Names of the copies in a consumer namespace. Empty means "do not copy".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingTargets {
    pub secret: String,
    pub configmap: String,
}

/// Scan `request` for the entry pointing at the registry and operand, and
/// return the names declared by its first public binding.
///
/// Request entries, operands and bindings are scanned in declaration order;
/// the first public binding found wins. No match yields empty names.
#[must_use]
pub fn binding_targets(
    request: &OperandRequest,
    registry_name: &str,
    registry_namespace: &str,
    operand: &str,
) -> BindingTargets {
    let request_namespace = request.metadata.namespace.as_deref().unwrap_or_default();
    request
        .spec
        .requests
        .iter()
        .filter(|entry| entry.targets_registry(registry_name, registry_namespace, request_namespace))
        .flat_map(|entry| entry.operands.iter())
        .filter(|candidate| candidate.name == operand)
        .flat_map(|candidate| candidate.bindings.iter())
        .find(|binding| binding.scope.is_public())
        .map(|binding| BindingTargets {
            secret: binding.secret_name().to_string(),
            configmap: binding.configmap_name().to_string(),
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Binding, Operand, OperandRequestSpec, Request, Scope};

    fn binding(scope: Scope, secret: Option<&str>, configmap: Option<&str>) -> Binding {
        Binding {
            scope,
            secret: secret.map(str::to_string),
            configmap: configmap.map(str::to_string),
        }
    }

    fn request(entries: Vec<Request>) -> OperandRequest {
        let mut request = OperandRequest::new("req", OperandRequestSpec { requests: entries });
        request.metadata.namespace = Some("team-a".to_string());
        request
    }

    fn entry(registry: &str, operand: &str, bindings: Vec<Binding>) -> Request {
        Request {
            registry: registry.to_string(),
            registry_namespace: Some("registries".to_string()),
            operands: vec![Operand {
                name: operand.to_string(),
                bindings,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_first_public_binding_wins() {
        let request = request(vec![entry(
            "common-service",
            "mongodb",
            vec![
                binding(Scope::Private, Some("private-secret"), None),
                binding(Scope::Public, Some("db-secret"), Some("db-config")),
                binding(Scope::Public, Some("later-secret"), Some("later-config")),
            ],
        )]);
        assert_eq!(
            binding_targets(&request, "common-service", "registries", "mongodb"),
            BindingTargets {
                secret: "db-secret".to_string(),
                configmap: "db-config".to_string(),
            }
        );
    }

    #[test]
    fn test_absent_keys_become_empty_names() {
        let request = request(vec![entry(
            "common-service",
            "mongodb",
            vec![binding(Scope::Public, Some("db-secret"), None)],
        )]);
        let targets = binding_targets(&request, "common-service", "registries", "mongodb");
        assert_eq!(targets.secret, "db-secret");
        assert_eq!(targets.configmap, "");
    }

    #[test]
    fn test_entries_for_other_registries_are_ignored() {
        let request = request(vec![
            entry(
                "other-registry",
                "mongodb",
                vec![binding(Scope::Public, Some("wrong"), Some("wrong"))],
            ),
            entry(
                "common-service",
                "mongodb",
                vec![binding(Scope::Public, Some("right"), Some("right"))],
            ),
        ]);
        let targets = binding_targets(&request, "common-service", "registries", "mongodb");
        assert_eq!(targets.secret, "right");
    }

    #[test]
    fn test_registry_namespace_must_match() {
        let request = request(vec![entry(
            "common-service",
            "mongodb",
            vec![binding(Scope::Public, Some("db-secret"), None)],
        )]);
        assert_eq!(
            binding_targets(&request, "common-service", "elsewhere", "mongodb"),
            BindingTargets::default()
        );
    }

    #[test]
    fn test_no_public_binding_yields_empty_names() {
        let request = request(vec![entry(
            "common-service",
            "mongodb",
            vec![binding(
                Scope::Unrecognized("Public".to_string()),
                Some("db-secret"),
                Some("db-config"),
            )],
        )]);
        assert_eq!(
            binding_targets(&request, "common-service", "registries", "mongodb"),
            BindingTargets::default()
        );
        assert_eq!(
            binding_targets(&request, "common-service", "registries", "redis"),
            BindingTargets::default()
        );
    }
}
