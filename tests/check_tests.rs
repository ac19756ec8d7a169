//! # Check Execution Tests
//!
//! Runs checks against a mock API server so the request/response contract
//! is exercised without a cluster.

use http::{Request, Response};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::client::Body;
use mongodb_cluster_e2e::checks;
use mongodb_cluster_e2e::crd::{MongoDbClusterSpec, SecurityConfig};
use mongodb_cluster_e2e::{
    CheckContext, HarnessClient, HarnessError, MongoDbCluster,
};
use std::collections::BTreeMap;

type ApiServerHandle = tower_test::mock::Handle<Request<Body>, Response<Body>>;

fn mock_context() -> (CheckContext, ApiServerHandle) {
    let (service, handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
    let client = kube::Client::new(service, "mongodb-e2e");
    (CheckContext::new(HarnessClient::new(client)), handle)
}

fn test_cluster() -> MongoDbCluster {
    let mut mdb = MongoDbCluster::new(
        "example-mdb",
        MongoDbClusterSpec {
            members: 3,
            version: "6.0.5".to_string(),
            security: SecurityConfig::default(),
            users: vec![],
            custom_roles: None,
        },
    );
    mdb.metadata.namespace = Some("mongodb-e2e".to_string());
    mdb
}

fn config_secret(version: i64) -> Secret {
    let payload = serde_json::json!({ "version": version, "roles": [] });
    let mut data = BTreeMap::new();
    data.insert(
        "cluster-config.json".to_string(),
        ByteString(serde_json::to_vec(&payload).unwrap()),
    );
    Secret {
        metadata: kube::api::ObjectMeta {
            name: Some("example-mdb-config".to_string()),
            namespace: Some("mongodb-e2e".to_string()),
            ..kube::api::ObjectMeta::default()
        },
        data: Some(data),
        ..Secret::default()
    }
}

fn json_response<T: serde::Serialize>(body: &T) -> Response<Body> {
    Response::builder()
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn not_found_response() -> Response<Body> {
    let status = serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": "not found",
        "reason": "NotFound",
        "code": 404
    });
    Response::builder()
        .status(404)
        .body(Body::from(serde_json::to_vec(&status).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn version_check_reads_the_published_config_secret() {
    let (ctx, mut handle) = mock_context();
    let check = checks::automation_config_has_version(&test_cluster(), 2);

    let run = tokio::spawn(async move { check.run(&ctx).await });

    let (request, send) = handle.next_request().await.expect("api request");
    assert_eq!(
        request.uri().path(),
        "/api/v1/namespaces/mongodb-e2e/secrets/example-mdb-config"
    );
    send.send_response(json_response(&config_secret(2)));

    let report = run.await.unwrap();
    assert!(report.passed(), "report: {report:?}");
}

#[tokio::test]
async fn version_mismatch_reports_both_values() {
    let (ctx, mut handle) = mock_context();
    let check = checks::automation_config_has_version(&test_cluster(), 2);

    let run = tokio::spawn(async move { check.run(&ctx).await });

    let (_request, send) = handle.next_request().await.expect("api request");
    send.send_response(json_response(&config_secret(5)));

    let report = run.await.unwrap();
    let failure = report.failure().expect("check should fail");
    assert!(failure.contains('2') && failure.contains('5'), "{failure}");
}

#[tokio::test]
async fn absent_secret_surfaces_the_full_identity() {
    let (ctx, mut handle) = mock_context();
    let check = checks::automation_config_has_version(&test_cluster(), 1);

    let run = tokio::spawn(async move { check.run(&ctx).await });

    let (_request, send) = handle.next_request().await.expect("api request");
    send.send_response(not_found_response());

    let report = run.await.unwrap();
    let failure = report.failure().expect("check should fail");
    assert!(
        failure.contains("mongodb-e2e/example-mdb-config"),
        "{failure}"
    );
}

#[tokio::test]
async fn groups_run_every_child_and_aggregate() {
    let (ctx, _handle) = mock_context();
    let tree = mongodb_cluster_e2e::Check::group(
        "outer",
        vec![
            mongodb_cluster_e2e::Check::new("passes", |_ctx| async { Ok(()) }),
            mongodb_cluster_e2e::Check::group(
                "inner",
                vec![
                    mongodb_cluster_e2e::Check::new("fails", |_ctx| async {
                        Err(HarnessError::assertion("subject", 1, 2))
                    }),
                    mongodb_cluster_e2e::Check::new("still runs", |_ctx| async { Ok(()) }),
                ],
            ),
        ],
    );

    let report = tree.run(&ctx).await;
    assert!(!report.passed());
    assert_eq!(report.name, "outer");
    assert_eq!(report.children.len(), 2);
    assert!(report.children[0].passed());

    let inner = &report.children[1];
    assert!(!inner.passed());
    assert_eq!(inner.children.len(), 2, "siblings run after a failure");
    assert!(!inner.children[0].passed());
    assert!(inner.children[1].passed());
}

#[tokio::test]
async fn phase_check_is_a_pure_read_and_compare() {
    // Two identical runs against identical observed state agree.
    for _ in 0..2 {
        let (ctx, mut handle) = mock_context();
        let mdb = test_cluster();
        let check = checks::reaches_phase(&mdb, mongodb_cluster_e2e::Phase::Running);
        let run = tokio::spawn(async move { check.run(&ctx).await });

        let (_request, send) = handle.next_request().await.expect("api request");
        let mut observed = test_cluster();
        observed.status = Some(mongodb_cluster_e2e::scenario::expected_status(&observed));
        send.send_response(json_response(&observed));

        let report = run.await.unwrap();
        assert!(report.passed(), "report: {report:?}");
    }
}
