//! # Replica Set End-to-End Scenarios
//!
//! Full convergence scenarios against a live cluster running the operator.
//! The namespace comes from `E2E_NAMESPACE`; user credentials and, for the
//! TLS scenario, certificate material are provisioned by the surrounding
//! environment before these run.
//!
//! Run with: cargo test --test replica_set_e2e -- --ignored

use mongodb_cluster_e2e::automation_config::CustomRole;
use mongodb_cluster_e2e::checks;
use mongodb_cluster_e2e::connectivity::{connectivity_fails, connectivity_succeeds};
use mongodb_cluster_e2e::crd::{
    MongoDbClusterSpec, MongoDbUser, SecurityConfig, TlsConfig,
};
use mongodb_cluster_e2e::scenario::{self, Scenario};
use mongodb_cluster_e2e::{
    CheckContext, HarnessClient, MongoDbCluster, Phase, SessionOptions,
};

const E2E_USER: &str = "e2e-user";
const E2E_PASSWORD_ENV: &str = "E2E_USER_PASSWORD";
const MONGOD_CONTAINER: &str = "mongod";

async fn setup() -> CheckContext {
    mongodb_cluster_e2e::runtime::init_crypto();
    mongodb_cluster_e2e::runtime::init_test_tracing();
    let client = HarnessClient::try_default()
        .await
        .expect("kubeconfig available");
    CheckContext::new(client)
}

fn new_cluster(name: &str, members: i32, tls_enabled: bool) -> MongoDbCluster {
    let mut mdb = MongoDbCluster::new(
        name,
        MongoDbClusterSpec {
            members,
            version: "6.0.5".to_string(),
            security: SecurityConfig {
                tls: TlsConfig {
                    enabled: tls_enabled,
                    optional: false,
                },
            },
            users: vec![MongoDbUser {
                name: E2E_USER.to_string(),
                db: "admin".to_string(),
                password_secret_name: format!("{E2E_USER}-password"),
            }],
            custom_roles: None,
        },
    );
    mdb.metadata.namespace = Some(mongodb_cluster_e2e::runtime::test_namespace());
    mdb
}

fn session() -> SessionOptions {
    let password = std::env::var(E2E_PASSWORD_ENV).expect("e2e user password in environment");
    SessionOptions::scram(E2E_USER, password)
}

#[tokio::test]
#[ignore = "requires Kubernetes cluster"]
async fn replica_set_reaches_basic_functionality() {
    let ctx = setup().await;
    let mdb = new_cluster("mdb-basic", 3, false);

    let report = Scenario::new("replica set basic functionality")
        .action(scenario::create_cluster(&mdb))
        .check(scenario::basic_functionality(&mdb))
        .check(checks::statefulset_has_update_strategy(&mdb, "RollingUpdate"))
        .check(checks::automation_config_has_version(&mdb, 1))
        .check(connectivity_succeeds(&mdb, session()))
        .check(checks::exec_in_container(
            &mdb,
            0,
            MONGOD_CONTAINER,
            &["mongosh", "--quiet", "--eval", "db.runCommand({ ping: 1 })"],
        ))
        .run(&ctx)
        .await;

    assert!(report.passed(), "failed steps: {:?}", report.failed_steps());
}

#[tokio::test]
#[ignore = "requires Kubernetes cluster"]
async fn replica_set_scales_up_and_back_down() {
    let ctx = setup().await;
    let mdb = new_cluster("mdb-scale", 3, false);

    let report = Scenario::new("replica set scale up and down")
        .action(scenario::create_cluster(&mdb))
        .check(scenario::basic_functionality(&mdb))
        .action(scenario::scale(&mdb, 5))
        .check(checks::statefulset_becomes_ready(&mdb))
        .check(checks::reaches_phase(&mdb, Phase::Running))
        .check(checks::status_matches_spec(&mdb))
        .action(scenario::scale(&mdb, 3))
        .check(checks::statefulset_ready_after_scale_down(&mdb))
        .check(checks::reaches_phase(&mdb, Phase::Running))
        .check(checks::status_matches_spec(&mdb))
        .run(&ctx)
        .await;

    assert!(report.passed(), "failed steps: {:?}", report.failed_steps());
}

#[tokio::test]
#[ignore = "requires Kubernetes cluster"]
async fn tls_toggle_inverts_connectivity() {
    let ctx = setup().await;
    let mdb = new_cluster("mdb-tls", 3, true);
    let ca_file = std::env::var("E2E_TLS_CA_FILE").ok().map(Into::into);

    let report = Scenario::new("tls toggle")
        .action(scenario::create_cluster(&mdb))
        .check(scenario::basic_functionality(&mdb))
        .check(connectivity_succeeds(
            &mdb,
            session().with_tls(ca_file),
        ))
        .check(connectivity_fails(&mdb, session().without_tls()))
        .action(scenario::disable_tls(&mdb))
        .check(checks::reaches_phase(&mdb, Phase::Failed))
        .action(scenario::enable_tls(&mdb))
        .check(checks::reaches_phase(&mdb, Phase::Running))
        .run(&ctx)
        .await;

    assert!(report.passed(), "failed steps: {:?}", report.failed_steps());
}

#[tokio::test]
#[ignore = "requires Kubernetes cluster"]
async fn deleted_pod_is_healed() {
    let ctx = setup().await;
    let mdb = new_cluster("mdb-heal", 3, false);

    let report = Scenario::new("self healing after pod deletion")
        .action(scenario::create_cluster(&mdb))
        .check(scenario::basic_functionality(&mdb))
        .action(scenario::delete_pod(&mdb, 0))
        .check(checks::statefulset_becomes_unready(&mdb))
        .check(checks::statefulset_becomes_ready(&mdb))
        .check(checks::pod_container_becomes_ready(&mdb, 0, MONGOD_CONTAINER))
        .check(checks::reaches_phase(&mdb, Phase::Running))
        .run(&ctx)
        .await;

    assert!(report.passed(), "failed steps: {:?}", report.failed_steps());
}

#[tokio::test]
#[ignore = "requires Kubernetes cluster"]
async fn version_change_republishes_the_automation_config() {
    let ctx = setup().await;
    let mdb = new_cluster("mdb-version", 3, false);

    let report = Scenario::new("version change bumps config version")
        .action(scenario::create_cluster(&mdb))
        .check(scenario::basic_functionality(&mdb))
        .check(checks::automation_config_has_version(&mdb, 1))
        .action(scenario::change_version(&mdb, "6.0.6"))
        .check(checks::reaches_phase(&mdb, Phase::Running))
        .check(checks::statefulset_becomes_ready(&mdb))
        .check(checks::automation_config_has_version(&mdb, 2))
        .check(checks::container_condition_is_true(
            &mdb,
            MONGOD_CONTAINER,
            |container| {
                container
                    .image
                    .as_deref()
                    .is_some_and(|image| image.ends_with(":6.0.6"))
            },
        ))
        .run(&ctx)
        .await;

    assert!(report.passed(), "failed steps: {:?}", report.failed_steps());
}

#[tokio::test]
#[ignore = "requires Kubernetes cluster"]
async fn custom_roles_are_published_as_a_set() {
    let ctx = setup().await;
    let mut mdb = new_cluster("mdb-roles", 3, false);
    let roles = vec![
        CustomRole {
            role: "auditor".to_string(),
            db: "admin".to_string(),
            ..CustomRole::default()
        },
        CustomRole {
            role: "readAnalytics".to_string(),
            db: "reporting".to_string(),
            ..CustomRole::default()
        },
    ];
    mdb.spec.custom_roles = Some(roles.clone());

    let report = Scenario::new("custom roles published")
        .action(scenario::create_cluster(&mdb))
        .check(scenario::basic_functionality(&mdb))
        .check(checks::automation_config_has_roles(&mdb, roles))
        .run(&ctx)
        .await;

    assert!(report.passed(), "failed steps: {:?}", report.failed_steps());
}
