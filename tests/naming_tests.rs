//! # Naming and Expected-State Tests
//!
//! The derived names must stay bit-exact with what the operator produces;
//! a drifted suffix would make every accessor lookup miss silently.

use mongodb_cluster_e2e::crd::{MongoDbClusterSpec, SecurityConfig};
use mongodb_cluster_e2e::scenario::expected_status;
use mongodb_cluster_e2e::{MongoDbCluster, Phase};

fn cluster(name: &str, namespace: &str, members: i32) -> MongoDbCluster {
    let mut mdb = MongoDbCluster::new(
        name,
        MongoDbClusterSpec {
            members,
            version: "6.0.5".to_string(),
            security: SecurityConfig::default(),
            users: vec![],
            custom_roles: None,
        },
    );
    mdb.metadata.namespace = Some(namespace.to_string());
    mdb
}

#[test]
fn pod_addresses_resolve_through_the_headless_service() {
    let mdb = cluster("mdb-tls", "teams-a", 3);
    assert_eq!(
        mdb.pod_fqdn(1),
        "mdb-tls-1.mdb-tls-svc.teams-a.svc.cluster.local:27017"
    );
}

#[test]
fn expected_status_is_computed_from_the_spec() {
    let mdb = cluster("example-mdb", "mongodb-e2e", 3);
    let expected = expected_status(&mdb);

    assert_eq!(expected.phase, Phase::Running);
    assert_eq!(expected.current_mongodb_members, 3);
    assert_eq!(expected.current_stateful_set_replicas, 3);
    assert_eq!(expected.mongo_uri, mdb.mongo_uri());
}

#[test]
fn expected_status_follows_spec_mutations() {
    let mut mdb = cluster("example-mdb", "mongodb-e2e", 3);
    let before = expected_status(&mdb);

    mdb.spec.members = 5;
    let after = expected_status(&mdb);

    assert_eq!(after.current_mongodb_members, 5);
    assert_eq!(after.current_stateful_set_replicas, 5);
    assert_ne!(before.mongo_uri, after.mongo_uri, "URI gains the new members");
    assert!(after.mongo_uri.contains("example-mdb-4"));
}

#[test]
fn status_equality_is_exact_and_structural() {
    let mdb = cluster("example-mdb", "mongodb-e2e", 3);
    let expected = expected_status(&mdb);

    let mut drifted = expected.clone();
    drifted.current_stateful_set_replicas = 2;
    assert_ne!(expected, drifted);

    let mut wrong_uri = expected.clone();
    wrong_uri.mongo_uri = "mongodb://localhost:27017".to_string();
    assert_ne!(expected, wrong_uri);

    assert_eq!(expected, expected.clone());
}
