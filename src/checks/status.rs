//! # Status and Configuration Checks
//!
//! Checks over the cluster's observed status and the automation config the
//! operator publishes for its agents.
//!
//! The configuration checks deliberately do not retry: by the time they run,
//! a prior readiness or phase assertion has already waited out convergence.

use crate::automation_config::{roles_match, AutomationConfig, CustomRole};
use crate::checks::Check;
use crate::constants;
use crate::crd::{MongoDbCluster, MongoDbClusterStatus, Phase};
use crate::error::HarnessError;
use crate::scenario::expected_status;
use crate::wait;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;

/// The cluster reaches the expected phase.
///
/// Running gets the full readiness budget; Failed gets a short one, since a
/// failure that only manifests eventually is itself a defect.
pub fn reaches_phase(mdb: &MongoDbCluster, phase: Phase) -> Check {
    let mdb = mdb.clone();
    let timeout = match phase {
        Phase::Failed => constants::FAILED_PHASE_TIMEOUT,
        _ => constants::READY_TIMEOUT,
    };
    Check::new(
        format!("cluster {} reaches phase {phase}", mdb.name_any()),
        move |ctx| async move {
            wait::wait_for_phase(
                &ctx.client,
                &mdb,
                phase,
                constants::READY_POLL_INTERVAL,
                timeout,
            )
            .await
        },
    )
}

/// The automation config secret appears and carries the config document
/// under its well-known key.
pub fn automation_config_secret_exists(mdb: &MongoDbCluster) -> Check {
    let mdb = mdb.clone();
    Check::new(
        format!(
            "secret {} exists with automation config",
            mdb.automation_config_secret_name()
        ),
        move |ctx| async move {
            let secret = wait::wait_for_secret_exists(
                &ctx.client,
                &mdb.target_namespace(),
                &mdb.automation_config_secret_name(),
                constants::SECRET_POLL_INTERVAL,
                constants::SECRET_TIMEOUT,
            )
            .await?;
            AutomationConfig::from_secret(&secret).map(|_| ())
        },
    )
}

async fn fetch_automation_config(
    ctx: &crate::checks::CheckContext,
    mdb: &MongoDbCluster,
) -> Result<AutomationConfig, HarnessError> {
    let secret: Secret = ctx
        .client
        .get(
            &mdb.target_namespace(),
            &mdb.automation_config_secret_name(),
        )
        .await?;
    AutomationConfig::from_secret(&secret)
}

/// The automation config version counter equals the expected value.
pub fn automation_config_has_version(mdb: &MongoDbCluster, expected: i64) -> Check {
    let mdb = mdb.clone();
    Check::new(
        format!(
            "automation config of {} has version {expected}",
            mdb.name_any()
        ),
        move |ctx| async move {
            let config = fetch_automation_config(&ctx, &mdb).await?;
            if config.version == expected {
                Ok(())
            } else {
                Err(HarnessError::assertion(
                    format!("automation config version of {}", mdb.name_any()),
                    expected,
                    config.version,
                ))
            }
        },
    )
}

/// The automation config's custom role set equals the expected set,
/// order-insensitively.
pub fn automation_config_has_roles(mdb: &MongoDbCluster, expected: Vec<CustomRole>) -> Check {
    let mdb = mdb.clone();
    Check::new(
        format!("automation config of {} has expected roles", mdb.name_any()),
        move |ctx| async move {
            let config = fetch_automation_config(&ctx, &mdb).await?;
            if roles_match(&config.roles, &expected) {
                Ok(())
            } else {
                Err(HarnessError::assertion(
                    format!("automation config roles of {}", mdb.name_any()),
                    &expected,
                    &config.roles,
                ))
            }
        },
    )
}

/// The cluster's full status record equals the expected record exactly.
pub fn status_matches(mdb: &MongoDbCluster, expected: MongoDbClusterStatus) -> Check {
    let mdb = mdb.clone();
    Check::new(
        format!("status of {} matches expected record", mdb.name_any()),
        move |ctx| async move {
            let namespace = mdb.target_namespace();
            let name = mdb.name_any();
            let cluster = ctx.client.get_cluster(&namespace, &name).await?;
            let actual = cluster.status.ok_or_else(|| HarnessError::MissingField {
                kind: "MongoDbCluster".to_string(),
                namespace: namespace.clone(),
                name: name.clone(),
                field: "status".to_string(),
            })?;
            if actual == expected {
                Ok(())
            } else {
                Err(HarnessError::assertion(
                    format!("status of MongoDbCluster {namespace}/{name}"),
                    &expected,
                    &actual,
                ))
            }
        },
    )
}

/// The cluster's status record equals the record its *current* spec should
/// produce once Running. The spec is fetched at run time, so the check stays
/// correct after interleaved mutation steps.
pub fn status_matches_spec(mdb: &MongoDbCluster) -> Check {
    let mdb = mdb.clone();
    Check::new(
        format!("status of {} agrees with its spec", mdb.name_any()),
        move |ctx| async move {
            let namespace = mdb.target_namespace();
            let name = mdb.name_any();
            let cluster = ctx.client.get_cluster(&namespace, &name).await?;
            let expected = expected_status(&cluster);
            let actual = cluster
                .status
                .clone()
                .ok_or_else(|| HarnessError::MissingField {
                    kind: "MongoDbCluster".to_string(),
                    namespace: namespace.clone(),
                    name: name.clone(),
                    field: "status".to_string(),
                })?;
            if actual == expected {
                Ok(())
            } else {
                Err(HarnessError::assertion(
                    format!("status of MongoDbCluster {namespace}/{name}"),
                    &expected,
                    &actual,
                ))
            }
        },
    )
}
