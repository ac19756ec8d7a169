//! # Constants
//!
//! Naming conventions, well-known secret keys, and default polling budgets.
//!
//! The naming suffixes must stay bit-exact with what the operator derives
//! for its sub-resources; a drifted suffix makes every lookup miss.

use std::time::Duration;

/// Suffix appended to the cluster name to form the headless service name.
pub const SERVICE_SUFFIX: &str = "-svc";

/// Suffix appended to the cluster name to form the automation config secret name.
pub const AUTOMATION_CONFIG_SECRET_SUFFIX: &str = "-config";

/// Suffix appended to the cluster name to form the agent password secret name.
pub const AGENT_PASSWORD_SECRET_SUFFIX: &str = "-agent-password";

/// Suffix appended to the cluster name to form the agent keyfile secret name.
pub const AGENT_KEYFILE_SECRET_SUFFIX: &str = "-keyfile";

/// Key under which the automation config document is stored in its secret.
pub const AUTOMATION_CONFIG_KEY: &str = "cluster-config.json";

/// Port mongod listens on inside each pod.
pub const MONGODB_PORT: u16 = 27017;

/// Cluster-internal DNS zone for per-pod addresses.
pub const CLUSTER_DOMAIN: &str = "svc.cluster.local";

/// Environment variable selecting the namespace e2e scenarios run in.
pub const ENV_E2E_NAMESPACE: &str = "E2E_NAMESPACE";

/// Namespace used when `E2E_NAMESPACE` is not set.
pub const DEFAULT_E2E_NAMESPACE: &str = "mongodb-e2e";

/// Poll interval for cluster-wide readiness conditions.
pub const READY_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Timeout for cluster-wide readiness conditions (image pulls, replica set
/// initiation, and agent goal-state convergence all land inside this budget).
pub const READY_TIMEOUT: Duration = Duration::from_secs(12 * 60);

/// Poll interval when waiting out a scale-down.
pub const SCALE_DOWN_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Timeout when waiting out a scale-down. Graceful member removal drains one
/// member at a time, so this is far above the plain readiness budget.
pub const SCALE_DOWN_TIMEOUT: Duration = Duration::from_secs(45 * 60);

/// Poll interval for secret existence checks.
pub const SECRET_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Timeout for secret existence checks.
pub const SECRET_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for reaching the Failed phase. Failure should manifest quickly;
/// waiting the full readiness budget would only hide a stuck controller.
pub const FAILED_PHASE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Timeout for observing an update strategy change on the workload.
pub const UPDATE_STRATEGY_TIMEOUT: Duration = Duration::from_secs(8 * 60);

/// Poll interval for per-pod container readiness checks.
pub const POD_READINESS_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Timeout for a container becoming ready.
pub const POD_READY_TIMEOUT: Duration = Duration::from_secs(3 * 60);

/// Timeout for a container becoming not ready. Disruption propagation lags
/// behind the disruption itself, so this budget is the longer of the two.
pub const POD_UNREADY_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Top-level bound on establishing a MongoDB session (DNS + TLS variance).
pub const CONNECTIVITY_SESSION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Interval between write-probe attempts once a session is established.
pub const CONNECTIVITY_WRITE_INTERVAL: Duration = Duration::from_secs(1);

/// Budget for the write probe to succeed.
pub const CONNECTIVITY_WRITE_TIMEOUT: Duration = Duration::from_secs(30);
