//! # Ownership Checks
//!
//! Every sub-resource the operator creates must carry exactly one owner
//! reference, equal to the cluster's derived identity. Ownership is set at
//! creation and never converges, so these checks fetch once and fail fast.

use crate::checks::Check;
use crate::crd::MongoDbCluster;
use crate::error::HarnessError;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};

/// The cluster's derived ownership identity, as the controller stamps it on
/// sub-resources. Requires a server-assigned uid, so the cluster is fetched
/// fresh rather than read from a composition-time copy.
pub fn expected_owner_reference(mdb: &MongoDbCluster) -> Result<OwnerReference, HarnessError> {
    mdb.controller_owner_ref(&()).ok_or_else(|| {
        HarnessError::MissingField {
            kind: "MongoDbCluster".to_string(),
            namespace: mdb.target_namespace(),
            name: mdb.name_any(),
            field: "metadata.uid".to_string(),
        }
    })
}

/// Exactly one owner reference, bit-for-bit equal to the expected identity
/// on the four fields that define it.
fn assert_single_owner_reference(
    kind: &str,
    namespace: &str,
    name: &str,
    references: &[OwnerReference],
    expected: &OwnerReference,
) -> Result<(), HarnessError> {
    let subject = format!("{kind} {namespace}/{name} owner references");
    let [actual] = references else {
        return Err(HarnessError::AssertionFailure {
            subject,
            expected: "exactly one owner reference".to_string(),
            actual: format!("{} owner references", references.len()),
        });
    };
    let matches = actual.api_version == expected.api_version
        && actual.kind == "MongoDbCluster"
        && actual.name == expected.name
        && actual.uid == expected.uid;
    if matches {
        Ok(())
    } else {
        Err(HarnessError::assertion(subject, expected, actual))
    }
}

async fn fetch_expected(
    ctx: &crate::checks::CheckContext,
    mdb: &MongoDbCluster,
) -> Result<OwnerReference, HarnessError> {
    let cluster = ctx
        .client
        .get_cluster(&mdb.target_namespace(), &mdb.name_any())
        .await?;
    expected_owner_reference(&cluster)
}

/// The StatefulSet is owned by the cluster, and only by it.
pub fn statefulset_has_owner_reference(mdb: &MongoDbCluster) -> Check {
    let mdb = mdb.clone();
    Check::new(
        format!("statefulset {} has owner reference", mdb.name_any()),
        move |ctx| async move {
            let expected = fetch_expected(&ctx, &mdb).await?;
            let namespace = mdb.target_namespace();
            let name = mdb.name_any();
            let sts: StatefulSet = ctx.client.get(&namespace, &name).await?;
            assert_single_owner_reference(
                "StatefulSet",
                &namespace,
                &name,
                &sts.owner_references(),
                &expected,
            )
        },
    )
}

/// The headless service is owned by the cluster, and only by it.
pub fn service_has_owner_reference(mdb: &MongoDbCluster) -> Check {
    let mdb = mdb.clone();
    Check::new(
        format!("service {} has owner reference", mdb.service_name()),
        move |ctx| async move {
            let expected = fetch_expected(&ctx, &mdb).await?;
            let namespace = mdb.target_namespace();
            let name = mdb.service_name();
            let service: Service = ctx.client.get(&namespace, &name).await?;
            assert_single_owner_reference(
                "Service",
                &namespace,
                &name,
                &service.owner_references(),
                &expected,
            )
        },
    )
}

/// Both agent credential secrets (password and keyfile) are owned by the
/// cluster, and only by it.
pub fn agent_secrets_have_owner_reference(mdb: &MongoDbCluster) -> Check {
    let mdb = mdb.clone();
    Check::new(
        format!("agent secrets of {} have owner reference", mdb.name_any()),
        move |ctx| async move {
            let expected = fetch_expected(&ctx, &mdb).await?;
            let namespace = mdb.target_namespace();
            for name in [mdb.agent_password_secret_name(), mdb.keyfile_secret_name()] {
                let secret: Secret = ctx.client.get(&namespace, &name).await?;
                assert_single_owner_reference(
                    "Secret",
                    &namespace,
                    &name,
                    &secret.owner_references(),
                    &expected,
                )?;
            }
            Ok(())
        },
    )
}
