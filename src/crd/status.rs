//! # MongoDbCluster Status
//!
//! Observed state written by the operator under test. The harness only ever
//! reads these fields and compares them against expected records computed
//! from the spec.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reconciliation phase of a MongoDbCluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum Phase {
    /// Resource accepted, reconciliation has not produced a deployment yet
    #[default]
    Pending,
    /// A spec change is being rolled out
    Updating,
    /// All members are reachable and agree with the spec
    Running,
    /// Reconciliation cannot proceed with the current spec
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self {
            Phase::Pending => "Pending",
            Phase::Updating => "Updating",
            Phase::Running => "Running",
            Phase::Failed => "Failed",
        };
        f.write_str(phase)
    }
}

/// Status of the MongoDbCluster resource.
///
/// Equality checks against this type are exact and structural; a drifted
/// URI or member count fails the comparison even when the phase matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MongoDbClusterStatus {
    /// Connection string for the replica set
    #[serde(default)]
    pub mongo_uri: String,
    /// Current phase
    #[serde(default)]
    pub phase: Phase,
    /// Observed replica set member count
    #[serde(default)]
    pub current_mongodb_members: i32,
    /// Observed StatefulSet replica count
    #[serde(default)]
    pub current_stateful_set_replicas: i32,
}
