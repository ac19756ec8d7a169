//! # Custom Resource Definitions
//!
//! The `MongoDbCluster` CRD as observed by the verification harness.
//!
//! The harness owns the spec side of this type (it mutates members, version,
//! and transport security through it) but treats the status side as
//! read-only: only the operator under test writes status.

use crate::automation_config::CustomRole;
use crate::constants;
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod status;

pub use status::{MongoDbClusterStatus, Phase};

/// MongoDbCluster Custom Resource Definition
///
/// Declares a replicated MongoDB deployment: member count, engine version,
/// transport security, users, and custom role definitions. The operator
/// reconciles this into a StatefulSet, a headless Service, credential
/// secrets, and a versioned automation config secret.
///
/// # Example
///
/// ```yaml
/// apiVersion: mongodb.e2e.microscaler.io/v1
/// kind: MongoDbCluster
/// metadata:
///   name: example-mdb
///   namespace: mongodb-e2e
/// spec:
///   members: 3
///   version: "6.0.5"
///   security:
///     tls:
///       enabled: true
///   users:
///     - name: e2e-user
///       db: admin
///       passwordSecretName: e2e-user-password
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "MongoDbCluster",
    group = "mongodb.e2e.microscaler.io",
    version = "v1",
    namespaced,
    status = "MongoDbClusterStatus",
    shortname = "mdbc",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Members", "type":"integer", "jsonPath":".spec.members"}, {"name":"Version", "type":"string", "jsonPath":".spec.version"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MongoDbClusterSpec {
    /// Desired replica set member count
    pub members: i32,
    /// Desired MongoDB engine version (e.g. "6.0.5")
    pub version: String,
    /// Transport security configuration
    #[serde(default)]
    pub security: SecurityConfig,
    /// Database users the operator provisions credentials for
    #[serde(default)]
    pub users: Vec<MongoDbUser>,
    /// Custom role definitions published through the automation config
    #[serde(default)]
    pub custom_roles: Option<Vec<CustomRole>>,
}

/// Security configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
    /// TLS settings for client and intra-cluster traffic
    #[serde(default)]
    pub tls: TlsConfig,
}

/// TLS configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    /// Whether TLS is required for all connections
    #[serde(default)]
    pub enabled: bool,
    /// When true, plaintext connections stay accepted during a TLS rollout
    #[serde(default)]
    pub optional: bool,
}

/// A database user the operator provisions
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MongoDbUser {
    /// Username
    pub name: String,
    /// Authentication database
    #[serde(default = "default_user_db")]
    pub db: String,
    /// Name of the secret holding this user's password
    pub password_secret_name: String,
}

fn default_user_db() -> String {
    "admin".to_string()
}

impl MongoDbCluster {
    /// Namespace this cluster lives in. Empty for an unsubmitted resource.
    pub fn target_namespace(&self) -> String {
        self.namespace().unwrap_or_default()
    }

    /// Name of the headless service fronting the replica set.
    pub fn service_name(&self) -> String {
        format!("{}{}", self.name_any(), constants::SERVICE_SUFFIX)
    }

    /// Name of the pod realizing the member at `ordinal` (zero-based).
    pub fn pod_name(&self, ordinal: usize) -> String {
        format!("{}-{}", self.name_any(), ordinal)
    }

    /// Cluster-internal address of the member at `ordinal`.
    pub fn pod_fqdn(&self, ordinal: usize) -> String {
        format!(
            "{}.{}.{}.{}:{}",
            self.pod_name(ordinal),
            self.service_name(),
            self.target_namespace(),
            constants::CLUSTER_DOMAIN,
            constants::MONGODB_PORT
        )
    }

    /// Name of the secret carrying the automation config document.
    pub fn automation_config_secret_name(&self) -> String {
        format!(
            "{}{}",
            self.name_any(),
            constants::AUTOMATION_CONFIG_SECRET_SUFFIX
        )
    }

    /// Name of the secret carrying the agent password.
    pub fn agent_password_secret_name(&self) -> String {
        format!(
            "{}{}",
            self.name_any(),
            constants::AGENT_PASSWORD_SECRET_SUFFIX
        )
    }

    /// Name of the secret carrying the inter-member keyfile.
    pub fn keyfile_secret_name(&self) -> String {
        format!(
            "{}{}",
            self.name_any(),
            constants::AGENT_KEYFILE_SECRET_SUFFIX
        )
    }

    /// Connection string addressing every desired member.
    ///
    /// Computed from the spec, not the status, so it is valid input for an
    /// expected-status record before the cluster converges.
    pub fn mongo_uri(&self) -> String {
        let hosts: Vec<String> = (0..self.spec.members.max(0) as usize)
            .map(|ordinal| self.pod_fqdn(ordinal))
            .collect();
        format!("mongodb://{}", hosts.join(","))
    }
}
