//! # Bindings
//!
//! The `{scope, secret, configmap}` triple shared by OperandBindInfo and
//! OperandRequest.

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Visibility of a binding
///
/// Only `public` bindings are ever copied to consumer namespaces. Values the
/// controller does not recognise are kept verbatim so that writing the spec
/// back never rewrites what the user declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Scope {
    /// Shared with every namespace that requested the operand
    Public,
    /// Kept in the operand namespace
    #[default]
    Private,
    /// Anything else; treated like `Private`
    Unrecognized(String),
}

impl Scope {
    #[must_use]
    pub fn is_public(&self) -> bool {
        matches!(self, Scope::Public)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Scope::Public => "public",
            Scope::Private => "private",
            Scope::Unrecognized(other) => other,
        }
    }
}

impl From<String> for Scope {
    fn from(value: String) -> Self {
        match value.as_str() {
            "public" => Scope::Public,
            "private" => Scope::Private,
            _ => Scope::Unrecognized(value),
        }
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Unrecognized(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl JsonSchema for Scope {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("Scope")
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        // Plain string rather than an enum so unknown scopes survive admission
        let schema_value = serde_json::json!({
            "type": "string",
            "description": "Visibility of the binding. Only \"public\" bindings are copied to requesting namespaces; any other value, including \"private\", keeps the objects in the operand namespace."
        });
        Schema::try_from(schema_value).expect("Failed to create Schema for Scope")
    }
}

/// One shareable Secret/ConfigMap pair
///
/// On an OperandBindInfo the names refer to objects in the operand namespace.
/// On an OperandRequest they are the names the consumer wants the copies to
/// have in its own namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// Visibility of this binding (default: private)
    #[serde(default)]
    pub scope: Scope,
    /// Secret name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// ConfigMap name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configmap: Option<String>,
}

impl Binding {
    /// Secret name, empty when not declared
    #[must_use]
    pub fn secret_name(&self) -> &str {
        self.secret.as_deref().unwrap_or_default()
    }

    /// ConfigMap name, empty when not declared
    #[must_use]
    pub fn configmap_name(&self) -> &str {
        self.configmap.as_deref().unwrap_or_default()
    }
}
