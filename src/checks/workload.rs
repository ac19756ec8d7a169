//! # Workload Checks
//!
//! Checks over the StatefulSet realizing the cluster and its pods.

use crate::checks::Check;
use crate::constants;
use crate::crd::MongoDbCluster;
use crate::error::HarnessError;
use crate::wait;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Container;
use kube::ResourceExt;

/// The StatefulSet reaches its desired ready replica count.
///
/// The desired count is read from the spec fetched at run time, so the
/// check observes whatever a preceding scale action declared.
pub fn statefulset_becomes_ready(mdb: &MongoDbCluster) -> Check {
    let mdb = mdb.clone();
    Check::new(
        format!("statefulset {} becomes ready", mdb.name_any()),
        move |ctx| async move {
            let cluster = ctx
                .client
                .get_cluster(&mdb.target_namespace(), &mdb.name_any())
                .await?;
            wait::wait_for_statefulset_ready(
                &ctx.client,
                &cluster,
                cluster.spec.members,
                constants::READY_POLL_INTERVAL,
                constants::READY_TIMEOUT,
            )
            .await
        },
    )
}

/// The StatefulSet stops being ready, confirming a deliberate disruption
/// was observed.
pub fn statefulset_becomes_unready(mdb: &MongoDbCluster) -> Check {
    let mdb = mdb.clone();
    Check::new(
        format!("statefulset {} becomes unready", mdb.name_any()),
        move |ctx| async move {
            let cluster = ctx
                .client
                .get_cluster(&mdb.target_namespace(), &mdb.name_any())
                .await?;
            wait::wait_for_statefulset_unready(
                &ctx.client,
                &cluster,
                cluster.spec.members,
                constants::READY_POLL_INTERVAL,
                constants::READY_TIMEOUT,
            )
            .await
        },
    )
}

/// The StatefulSet settles at its desired replica count after a scale-down.
///
/// Same condition as [`statefulset_becomes_ready`] but on the scale-down
/// budget: members drain one at a time, so readiness arrives much later.
pub fn statefulset_ready_after_scale_down(mdb: &MongoDbCluster) -> Check {
    let mdb = mdb.clone();
    Check::new(
        format!("statefulset {} ready after scale down", mdb.name_any()),
        move |ctx| async move {
            let cluster = ctx
                .client
                .get_cluster(&mdb.target_namespace(), &mdb.name_any())
                .await?;
            wait::wait_for_statefulset_scaled_down(
                &ctx.client,
                &cluster,
                cluster.spec.members,
                constants::SCALE_DOWN_POLL_INTERVAL,
                constants::SCALE_DOWN_TIMEOUT,
            )
            .await
        },
    )
}

/// The StatefulSet declares the expected update strategy.
pub fn statefulset_has_update_strategy(mdb: &MongoDbCluster, strategy: &str) -> Check {
    let mdb = mdb.clone();
    let strategy = strategy.to_string();
    Check::new(
        format!(
            "statefulset {} has update strategy {strategy}",
            mdb.name_any()
        ),
        move |ctx| async move {
            wait::wait_for_statefulset_update_strategy(
                &ctx.client,
                &mdb,
                &strategy,
                constants::READY_POLL_INTERVAL,
                constants::UPDATE_STRATEGY_TIMEOUT,
            )
            .await
        },
    )
}

/// A named container in the workload's pod template satisfies a predicate
/// over its declared configuration. Fails fast: the template is set by the
/// controller at reconcile time and does not converge.
pub fn container_condition_is_true(
    mdb: &MongoDbCluster,
    container_name: &str,
    condition: impl Fn(&Container) -> bool + Send + Sync + 'static,
) -> Check {
    let mdb = mdb.clone();
    let container_name = container_name.to_string();
    Check::new(
        format!(
            "container {container_name} in statefulset {} satisfies condition",
            mdb.name_any()
        ),
        move |ctx| async move {
            let namespace = mdb.target_namespace();
            let name = mdb.name_any();
            let sts: StatefulSet = ctx.client.get(&namespace, &name).await?;
            let containers = sts
                .spec
                .as_ref()
                .and_then(|spec| spec.template.spec.as_ref())
                .map(|pod_spec| pod_spec.containers.as_slice())
                .unwrap_or_default();
            let container = containers
                .iter()
                .find(|container| container.name == container_name)
                .ok_or_else(|| HarnessError::MissingField {
                    kind: "StatefulSet".to_string(),
                    namespace: namespace.clone(),
                    name: name.clone(),
                    field: format!("template container {container_name}"),
                })?;
            if condition(container) {
                Ok(())
            } else {
                Err(HarnessError::AssertionFailure {
                    subject: format!("container {container_name} in statefulset {namespace}/{name}"),
                    expected: "condition to hold".to_string(),
                    actual: "condition evaluated false".to_string(),
                })
            }
        },
    )
}

/// The named container in the pod at `ordinal` becomes ready.
pub fn pod_container_becomes_ready(
    mdb: &MongoDbCluster,
    ordinal: usize,
    container: &str,
) -> Check {
    pod_container_readiness_check(mdb, ordinal, container, true, constants::POD_READY_TIMEOUT)
}

/// The named container in the pod at `ordinal` becomes not ready.
pub fn pod_container_becomes_not_ready(
    mdb: &MongoDbCluster,
    ordinal: usize,
    container: &str,
) -> Check {
    pod_container_readiness_check(mdb, ordinal, container, false, constants::POD_UNREADY_TIMEOUT)
}

fn pod_container_readiness_check(
    mdb: &MongoDbCluster,
    ordinal: usize,
    container: &str,
    expected_ready: bool,
    timeout: std::time::Duration,
) -> Check {
    let mdb = mdb.clone();
    let container = container.to_string();
    Check::new(
        format!(
            "container {container} in pod {} ready={expected_ready}",
            mdb.pod_name(ordinal)
        ),
        move |ctx| async move {
            wait::wait_for_pod_container_readiness(
                &ctx.client,
                &mdb.target_namespace(),
                &mdb.pod_name(ordinal),
                &container,
                expected_ready,
                constants::POD_READINESS_POLL_INTERVAL,
                timeout,
            )
            .await
        },
    )
}

/// A command run inside the named container of the pod at `ordinal`
/// completes successfully.
pub fn exec_in_container(
    mdb: &MongoDbCluster,
    ordinal: usize,
    container: &str,
    command: &[&str],
) -> Check {
    let mdb = mdb.clone();
    let container = container.to_string();
    let command: Vec<String> = command.iter().map(|arg| (*arg).to_string()).collect();
    Check::new(
        format!("exec in container {container} of pod {}", mdb.pod_name(ordinal)),
        move |ctx| async move {
            let args: Vec<&str> = command.iter().map(String::as_str).collect();
            ctx.client
                .exec_in_pod(
                    &mdb.target_namespace(),
                    &mdb.pod_name(ordinal),
                    &container,
                    &args,
                )
                .await?;
            Ok(())
        },
    )
}
