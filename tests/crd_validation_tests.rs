//! # CRD Validation Tests
//!
//! Sample manifests for every CRD, deserialized the way the API server hands
//! them to the controller, plus checks on the generated schemas.

use kube::core::CustomResourceExt;
use operand_bindinfo_controller::crd::{
    BindInfoPhase, OperandBindInfo, OperandRegistry, OperandRequest, Scope,
};

#[test]
fn test_bind_info_manifest() {
    let yaml = r#"
apiVersion: operator.ibm.com/v1alpha1
kind: OperandBindInfo
metadata:
  name: mongodb-bindinfo
  namespace: ibm-common-services
spec:
  operand: ibm-mongodb-operator
  registry: common-service
  description: Binding information shared with requesting namespaces
  bindings:
    - scope: public
      secret: mongodb-admin
      configmap: mongodb-endpoint
    - scope: private
      secret: mongodb-root
status:
  phase: Completed
  requestNamespaces:
    - team-a
    - team-b
"#;

    let bind_info: OperandBindInfo = serde_yaml::from_str(yaml).expect("valid OperandBindInfo");
    assert_eq!(bind_info.spec.operand, "ibm-mongodb-operator");
    assert_eq!(bind_info.spec.registry, "common-service");
    assert!(bind_info.spec.registry_namespace.is_none());
    assert_eq!(bind_info.registry_namespace(), "ibm-common-services");
    assert_eq!(bind_info.spec.bindings.len(), 2);
    assert_eq!(bind_info.spec.bindings[0].scope, Scope::Public);
    assert_eq!(bind_info.spec.bindings[1].configmap_name(), "");
    assert_eq!(bind_info.phase(), Some(BindInfoPhase::Completed));
    assert_eq!(
        bind_info.status.unwrap().request_namespaces,
        vec!["team-a".to_string(), "team-b".to_string()]
    );
}

#[test]
fn test_bind_info_initialized_phase() {
    let yaml = r#"
apiVersion: operator.ibm.com/v1alpha1
kind: OperandBindInfo
metadata:
  name: mongodb-bindinfo
  namespace: ibm-common-services
spec:
  operand: ibm-mongodb-operator
  registry: common-service
status:
  phase: Initialized
"#;

    let bind_info: OperandBindInfo = serde_yaml::from_str(yaml).expect("valid OperandBindInfo");
    assert_eq!(bind_info.phase(), Some(BindInfoPhase::Init));
    assert!(bind_info.spec.bindings.is_empty());
}

#[test]
fn test_unknown_scope_is_preserved() {
    let yaml = r#"
apiVersion: operator.ibm.com/v1alpha1
kind: OperandBindInfo
metadata:
  name: mongodb-bindinfo
  namespace: ibm-common-services
spec:
  operand: ibm-mongodb-operator
  registry: common-service
  bindings:
    - scope: Public
      secret: mongodb-admin
"#;

    let bind_info: OperandBindInfo = serde_yaml::from_str(yaml).expect("valid OperandBindInfo");
    let scope = &bind_info.spec.bindings[0].scope;
    assert!(!scope.is_public());

    let written = serde_yaml::to_string(&bind_info).unwrap();
    assert!(written.contains("scope: Public"));
}

#[test]
fn test_registry_manifest() {
    let yaml = r#"
apiVersion: operator.ibm.com/v1alpha1
kind: OperandRegistry
metadata:
  name: common-service
  namespace: ibm-common-services
spec:
  operators:
    - name: ibm-mongodb-operator
      namespace: ibm-common-services
      channel: v3
      packageName: ibm-mongodb-operator-app
      sourceName: opencloud-operators
      sourceNamespace: openshift-marketplace
status:
  operatorsStatus:
    ibm-mongodb-operator:
      reconcileRequests:
        - name: common-service
          namespace: team-a
"#;

    let registry: OperandRegistry = serde_yaml::from_str(yaml).expect("valid OperandRegistry");
    let operator = registry.operator("ibm-mongodb-operator").unwrap();
    assert_eq!(operator.namespace, "ibm-common-services");
    assert_eq!(operator.package_name.as_deref(), Some("ibm-mongodb-operator-app"));
    let requests = registry.reconcile_requests("ibm-mongodb-operator");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].namespace, "team-a");
}

#[test]
fn test_request_manifest() {
    let yaml = r#"
apiVersion: operator.ibm.com/v1alpha1
kind: OperandRequest
metadata:
  name: common-service
  namespace: team-a
spec:
  requests:
    - registry: common-service
      registryNamespace: ibm-common-services
      operands:
        - name: ibm-mongodb-operator
          bindings:
            - scope: public
              secret: my-mongodb-admin
              configmap: my-mongodb-endpoint
"#;

    let request: OperandRequest = serde_yaml::from_str(yaml).expect("valid OperandRequest");
    let entry = &request.spec.requests[0];
    assert!(entry.targets_registry("common-service", "ibm-common-services", "team-a"));
    let binding = &entry.operands[0].bindings[0];
    assert_eq!(binding.secret_name(), "my-mongodb-admin");
    assert_eq!(binding.configmap_name(), "my-mongodb-endpoint");
}

#[test]
fn test_bind_info_crd_definition() {
    let crd = OperandBindInfo::crd();
    assert_eq!(crd.spec.group, "operator.ibm.com");
    assert_eq!(crd.spec.names.kind, "OperandBindInfo");
    assert_eq!(crd.spec.names.short_names, Some(vec!["opbi".to_string()]));

    let version = &crd.spec.versions[0];
    assert_eq!(version.name, "v1alpha1");
    assert!(version
        .subresources
        .as_ref()
        .and_then(|s| s.status.as_ref())
        .is_some());

    let schema = serde_json::to_value(&version.schema).unwrap();
    let phase = &schema["openAPIV3Schema"]["properties"]["status"]["properties"]["phase"];
    let values: Vec<&str> = phase["enum"]
        .as_array()
        .expect("phase is an enum")
        .iter()
        .filter_map(serde_json::Value::as_str)
        .collect();
    assert_eq!(values, vec!["Initialized", "Completed", "Failed"]);
}

#[test]
fn test_every_crd_is_namespaced() {
    for crd in [
        OperandBindInfo::crd(),
        OperandRegistry::crd(),
        OperandRequest::crd(),
    ] {
        assert_eq!(crd.spec.scope, "Namespaced", "{}", crd.spec.names.kind);
    }
}
