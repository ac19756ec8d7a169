//! # Condition Poller
//!
//! Bounded sleep-then-check retry against the cluster under test.
//!
//! Polling, not watching: the system under test exposes no push channel the
//! harness could subscribe to, so every wait is an explicit bounded retry
//! loop. A check reports `Ok(true)` (condition met), `Ok(false)` (not yet,
//! keep polling), or `Err` (terminal, propagated immediately).

use crate::client::HarnessClient;
use crate::crd::{MongoDbCluster, Phase};
use crate::error::HarnessError;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{Pod, Secret};
use kube::ResourceExt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Repeatedly evaluate `check` every `interval` until it reports success,
/// fails terminally, or `timeout` elapses.
///
/// The first evaluation happens immediately; the interval only separates
/// attempts. One invocation is one single-threaded loop; callers wanting
/// concurrent polls run separate invocations.
pub async fn poll_until<F, Fut>(
    label: &str,
    interval: Duration,
    timeout: Duration,
    mut check: F,
) -> Result<(), HarnessError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, HarnessError>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        if check().await? {
            debug!(condition = label, attempt, "condition satisfied");
            return Ok(());
        }
        if tokio::time::Instant::now() + interval > deadline {
            return Err(HarnessError::Timeout {
                condition: label.to_string(),
            });
        }
        debug!(condition = label, attempt, "condition not yet met, retrying");
        tokio::time::sleep(interval).await;
    }
}

/// Whether the StatefulSet has settled at `desired` ready replicas with its
/// current rollout complete.
fn statefulset_is_ready(sts: &StatefulSet, desired: i32) -> bool {
    let Some(status) = sts.status.as_ref() else {
        return false;
    };
    let rollout_complete = match (&status.current_revision, &status.update_revision) {
        (Some(current), Some(update)) => current == update,
        _ => true,
    };
    status.ready_replicas.unwrap_or(0) == desired
        && status.updated_replicas.unwrap_or(0) == desired
        && rollout_complete
}

/// Whether the StatefulSet has settled at `desired` replicas after a
/// scale-down: the spec-level count must already agree before readiness
/// means anything.
fn statefulset_is_scaled_down(sts: &StatefulSet, desired: i32) -> bool {
    let Some(status) = sts.status.as_ref() else {
        return false;
    };
    status.replicas == desired && statefulset_is_ready(sts, desired)
}

/// Wait until the cluster's StatefulSet reports `desired` ready replicas.
pub async fn wait_for_statefulset_ready(
    client: &HarnessClient,
    mdb: &MongoDbCluster,
    desired: i32,
    interval: Duration,
    timeout: Duration,
) -> Result<(), HarnessError> {
    let namespace = mdb.target_namespace();
    let name = mdb.name_any();
    poll_until(
        &format!("statefulset {namespace}/{name} ready with {desired} replicas"),
        interval,
        timeout,
        || {
            let client = client.clone();
            let namespace = namespace.clone();
            let name = name.clone();
            async move {
                match client.get_opt::<StatefulSet>(&namespace, &name).await? {
                    Some(sts) => Ok(statefulset_is_ready(&sts, desired)),
                    None => Ok(false),
                }
            }
        },
    )
    .await?;
    info!(
        resource.namespace = %namespace,
        resource.name = %name,
        replicas = desired,
        "StatefulSet is ready"
    );
    Ok(())
}

/// Wait until the cluster's StatefulSet stops being ready.
///
/// Used to verify a deliberate disruption was actually observed before
/// asserting recovery from it.
pub async fn wait_for_statefulset_unready(
    client: &HarnessClient,
    mdb: &MongoDbCluster,
    desired: i32,
    interval: Duration,
    timeout: Duration,
) -> Result<(), HarnessError> {
    let namespace = mdb.target_namespace();
    let name = mdb.name_any();
    poll_until(
        &format!("statefulset {namespace}/{name} unready"),
        interval,
        timeout,
        || {
            let client = client.clone();
            let namespace = namespace.clone();
            let name = name.clone();
            async move {
                match client.get_opt::<StatefulSet>(&namespace, &name).await? {
                    Some(sts) => Ok(!statefulset_is_ready(&sts, desired)),
                    None => Ok(true),
                }
            }
        },
    )
    .await
}

/// Wait until the StatefulSet has drained down to `desired` replicas and is
/// ready again. Callers pass the scale-down interval/timeout pair.
pub async fn wait_for_statefulset_scaled_down(
    client: &HarnessClient,
    mdb: &MongoDbCluster,
    desired: i32,
    interval: Duration,
    timeout: Duration,
) -> Result<(), HarnessError> {
    let namespace = mdb.target_namespace();
    let name = mdb.name_any();
    poll_until(
        &format!("statefulset {namespace}/{name} scaled down to {desired} replicas"),
        interval,
        timeout,
        || {
            let client = client.clone();
            let namespace = namespace.clone();
            let name = name.clone();
            async move {
                match client.get_opt::<StatefulSet>(&namespace, &name).await? {
                    Some(sts) => Ok(statefulset_is_scaled_down(&sts, desired)),
                    None => Ok(false),
                }
            }
        },
    )
    .await
}

/// Wait until the StatefulSet declares the given update strategy.
pub async fn wait_for_statefulset_update_strategy(
    client: &HarnessClient,
    mdb: &MongoDbCluster,
    strategy: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<(), HarnessError> {
    let namespace = mdb.target_namespace();
    let name = mdb.name_any();
    poll_until(
        &format!("statefulset {namespace}/{name} has update strategy {strategy}"),
        interval,
        timeout,
        || {
            let client = client.clone();
            let namespace = namespace.clone();
            let name = name.clone();
            let strategy = strategy.to_string();
            async move {
                match client.get_opt::<StatefulSet>(&namespace, &name).await? {
                    Some(sts) => Ok(sts
                        .spec
                        .as_ref()
                        .and_then(|spec| spec.update_strategy.as_ref())
                        .and_then(|update| update.type_.as_deref())
                        == Some(strategy.as_str())),
                    None => Ok(false),
                }
            }
        },
    )
    .await
}

/// Wait until the cluster's status reports the expected phase.
pub async fn wait_for_phase(
    client: &HarnessClient,
    mdb: &MongoDbCluster,
    expected: Phase,
    interval: Duration,
    timeout: Duration,
) -> Result<(), HarnessError> {
    let namespace = mdb.target_namespace();
    let name = mdb.name_any();
    poll_until(
        &format!("cluster {namespace}/{name} reaches phase {expected}"),
        interval,
        timeout,
        || {
            let client = client.clone();
            let namespace = namespace.clone();
            let name = name.clone();
            async move {
                let cluster = client.get_cluster(&namespace, &name).await?;
                Ok(cluster.status.map(|status| status.phase) == Some(expected))
            }
        },
    )
    .await?;
    info!(
        resource.namespace = %namespace,
        resource.name = %name,
        phase = %expected,
        "cluster reached phase"
    );
    Ok(())
}

/// Wait until a secret exists, then return it.
///
/// Absence is tolerated while polling; any other client error is terminal.
pub async fn wait_for_secret_exists(
    client: &HarnessClient,
    namespace: &str,
    name: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<Secret, HarnessError> {
    poll_until(
        &format!("secret {namespace}/{name} exists"),
        interval,
        timeout,
        || {
            let client = client.clone();
            let namespace = namespace.to_string();
            let name = name.to_string();
            async move {
                Ok(client
                    .get_opt::<Secret>(&namespace, &name)
                    .await?
                    .is_some())
            }
        },
    )
    .await?;
    client.get::<Secret>(namespace, name).await
}

/// Whether the named container in the pod currently reports `ready`.
fn pod_container_readiness(pod: &Pod, container: &str) -> Option<bool> {
    pod.status
        .as_ref()
        .and_then(|status| status.container_statuses.as_ref())
        .and_then(|statuses| {
            statuses
                .iter()
                .find(|cs| cs.name == container)
                .map(|cs| cs.ready)
        })
}

/// Wait until the named container in the given pod reports the expected
/// readiness. A pod or container status that has not appeared yet counts as
/// "not yet", not as a failure.
pub async fn wait_for_pod_container_readiness(
    client: &HarnessClient,
    namespace: &str,
    pod_name: &str,
    container: &str,
    expected_ready: bool,
    interval: Duration,
    timeout: Duration,
) -> Result<(), HarnessError> {
    poll_until(
        &format!(
            "container {container} in pod {namespace}/{pod_name} ready={expected_ready}"
        ),
        interval,
        timeout,
        || {
            let client = client.clone();
            let namespace = namespace.to_string();
            let pod_name = pod_name.to_string();
            let container = container.to_string();
            async move {
                match client.get_opt::<Pod>(&namespace, &pod_name).await? {
                    Some(pod) => {
                        Ok(pod_container_readiness(&pod, &container) == Some(expected_ready))
                    }
                    None => Ok(false),
                }
            }
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::StatefulSetStatus;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn sts_with_status(status: StatefulSetStatus) -> StatefulSet {
        StatefulSet {
            status: Some(status),
            ..StatefulSet::default()
        }
    }

    #[test]
    fn readiness_requires_ready_and_updated_counts() {
        let sts = sts_with_status(StatefulSetStatus {
            replicas: 3,
            ready_replicas: Some(3),
            updated_replicas: Some(3),
            ..StatefulSetStatus::default()
        });
        assert!(statefulset_is_ready(&sts, 3));
        assert!(!statefulset_is_ready(&sts, 5));

        let rolling = sts_with_status(StatefulSetStatus {
            replicas: 3,
            ready_replicas: Some(3),
            updated_replicas: Some(2),
            ..StatefulSetStatus::default()
        });
        assert!(!statefulset_is_ready(&rolling, 3));
    }

    #[test]
    fn readiness_requires_settled_revision() {
        let mid_rollout = sts_with_status(StatefulSetStatus {
            replicas: 3,
            ready_replicas: Some(3),
            updated_replicas: Some(3),
            current_revision: Some("rev-1".to_string()),
            update_revision: Some("rev-2".to_string()),
            ..StatefulSetStatus::default()
        });
        assert!(!statefulset_is_ready(&mid_rollout, 3));
    }

    #[test]
    fn scale_down_also_checks_observed_replicas() {
        let draining = sts_with_status(StatefulSetStatus {
            replicas: 5,
            ready_replicas: Some(3),
            updated_replicas: Some(3),
            ..StatefulSetStatus::default()
        });
        assert!(!statefulset_is_scaled_down(&draining, 3));

        let settled = sts_with_status(StatefulSetStatus {
            replicas: 3,
            ready_replicas: Some(3),
            updated_replicas: Some(3),
            ..StatefulSetStatus::default()
        });
        assert!(statefulset_is_scaled_down(&settled, 3));
    }

    #[test]
    fn missing_status_is_never_ready() {
        assert!(!statefulset_is_ready(&StatefulSet::default(), 3));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_until_succeeds_on_later_attempt() {
        let attempts = AtomicU32::new(0);
        let result = poll_until(
            "third attempt succeeds",
            Duration::from_secs(1),
            Duration::from_secs(10),
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok(n >= 3) }
            },
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_until_timeout_carries_label() {
        let result = poll_until(
            "never satisfied",
            Duration::from_secs(1),
            Duration::from_secs(5),
            || async { Ok(false) },
        )
        .await;
        match result {
            Err(HarnessError::Timeout { condition }) => {
                assert_eq!(condition, "never satisfied");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn poll_until_propagates_terminal_errors_immediately() {
        let attempts = AtomicU32::new(0);
        let result = poll_until(
            "terminal on first attempt",
            Duration::from_secs(1),
            Duration::from_secs(60),
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(HarnessError::not_found(
                        "Secret",
                        "mongodb-e2e",
                        "example-mdb-config",
                    ))
                }
            },
        )
        .await;
        assert!(matches!(result, Err(HarnessError::NotFound { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
