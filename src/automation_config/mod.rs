//! # Automation Config
//!
//! The versioned configuration document the operator publishes for the
//! cluster's agents, stored as an opaque payload under a well-known key in
//! the automation config secret.
//!
//! The harness cares about two fields: the monotonic `version` counter
//! (incremented by exactly one for every accepted spec change that requires
//! a re-publish) and the custom role set.

use crate::constants::AUTOMATION_CONFIG_KEY;
use crate::error::HarnessError;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The slice of the automation config document the harness verifies.
///
/// The full document carries far more (process definitions, auth schema,
/// TLS material references); unknown fields are ignored on parse.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutomationConfig {
    /// Monotonic version counter
    pub version: i64,
    /// Custom role definitions, order not significant
    pub roles: Vec<CustomRole>,
}

/// A custom role definition.
///
/// Shared between the cluster spec (desired roles) and the automation config
/// (published roles); the harness only ever compares the two as sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomRole {
    /// Role name
    pub role: String,
    /// Database the role is defined on
    pub db: String,
    /// Privileges granted directly
    pub privileges: Vec<Privilege>,
    /// Roles inherited from
    pub roles: Vec<InheritedRole>,
}

/// A privilege granted to a custom role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Privilege {
    /// Resource the actions apply to
    pub resource: PrivilegeResource,
    /// Action names (e.g. "insert", "find")
    pub actions: Vec<String>,
}

/// The resource scope of a privilege.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivilegeResource {
    /// Database name; empty string means any database
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
    /// Collection name; empty string means any collection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Whether the privilege applies cluster-wide
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cluster: bool,
}

/// A role inherited by a custom role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct InheritedRole {
    /// Inherited role name
    pub role: String,
    /// Database the inherited role is defined on
    pub db: String,
}

impl AutomationConfig {
    /// Parse the automation config out of its secret.
    ///
    /// Fails with `MissingField` when the well-known key is absent and with
    /// `Config` when the payload does not parse.
    pub fn from_secret(secret: &Secret) -> Result<Self, HarnessError> {
        let payload = secret
            .data
            .as_ref()
            .and_then(|data| data.get(AUTOMATION_CONFIG_KEY))
            .ok_or_else(|| HarnessError::MissingField {
                kind: "Secret".to_string(),
                namespace: secret.namespace().unwrap_or_default(),
                name: secret.name_any(),
                field: format!("data.{AUTOMATION_CONFIG_KEY}"),
            })?;
        Ok(serde_json::from_slice(&payload.0)?)
    }
}

/// Compare two role lists as unordered sets.
///
/// Roles have no natural order in the config document; two publishes of the
/// same spec may serialize them differently.
pub fn roles_match(actual: &[CustomRole], expected: &[CustomRole]) -> bool {
    actual.len() == expected.len()
        && expected.iter().all(|role| actual.contains(role))
        && actual.iter().all(|role| expected.contains(role))
}
