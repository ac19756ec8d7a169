//! # MongoDB Cluster E2E Harness
//!
//! Convergence-verification harness for `MongoDbCluster` resources managed
//! by the MongoDB cluster operator: named, composable assertions over a
//! declaratively managed replica set, a bounded-retry condition poller for
//! its asynchronous convergence, and a best-effort connectivity probe.
//!
//! The operator itself is the system under test; the harness only reads and
//! mutates resources through the cluster API and observes what the operator
//! makes of them.

pub mod automation_config;
pub mod checks;
pub mod client;
pub mod connectivity;
pub mod constants;
pub mod crd;
pub mod error;
pub mod runtime;
pub mod scenario;
pub mod wait;

// Re-export the types nearly every scenario touches
pub use checks::{Check, CheckContext, CheckReport, Outcome};
pub use client::HarnessClient;
pub use connectivity::{SessionOptions, TlsMode};
pub use crd::{MongoDbCluster, MongoDbClusterSpec, MongoDbClusterStatus, Phase};
pub use error::HarnessError;
pub use scenario::{Scenario, ScenarioReport, Step};
