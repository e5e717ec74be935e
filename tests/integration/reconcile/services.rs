//! Managed services: readiness, connection secrets and ACLs on top of them.

use super::{kafka_acl, postgres, Harness, NAMESPACE, PROJECT};
use aiven_operator::constants::{FIELD_MANAGER, MANAGED_BY_LABEL};
use aiven_operator::controller::handler::{KafkaAclHandler, ServiceHandler};
use aiven_operator::controller::Phase;
use aiven_operator::crd::{ConditionStatus, ConditionType, ManagedResource, ServiceIntegrationItem};
use aiven_operator::provider::memory::Operation;
use aiven_operator::{KafkaAcl, PostgreSql};
use kube::core::object::HasStatus;

#[tokio::test]
async fn test_secret_published_once_running() {
    let h = Harness::new(ServiceHandler::<PostgreSql>::new());
    let key = h.insert(&postgres("pg-main"));

    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::Reconciling);
    assert_eq!(h.avn.service(PROJECT, "pg-main").unwrap().service_type, "pg");
    assert!(h.store.secret(NAMESPACE, "pg-main").is_none());
    assert_eq!(h.stored(&key).status().and_then(|s| s.state.clone()).as_deref(), Some("REBUILDING"));

    h.avn.set_service_state(PROJECT, "pg-main", "RUNNING");
    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::Running);

    let secret = h.store.secret(NAMESPACE, "pg-main").unwrap();
    let data = secret.string_data.unwrap();
    assert_eq!(data["PGHOST"], "pg-main-acme.aivencloud.com");
    assert_eq!(data["PGPORT"], "12691");
    assert_eq!(data["PGDATABASE"], "defaultdb");
    assert!(data["DATABASE_URI"].starts_with("postgres://avnadmin:"));

    let owner = &secret.metadata.owner_references.unwrap()[0];
    assert_eq!(owner.kind, "PostgreSQL");
    assert_eq!(owner.uid, "uid-postgres");
    assert_eq!(owner.controller, Some(true));
    assert_eq!(
        secret.metadata.labels.unwrap().get(MANAGED_BY_LABEL).map(String::as_str),
        Some(FIELD_MANAGER)
    );
}

#[tokio::test]
async fn test_rebuild_degrades_running() {
    let h = Harness::new(ServiceHandler::<PostgreSql>::new());
    h.avn.set_new_service_state("RUNNING");
    let key = h.insert(&postgres("pg-main"));
    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::Running);

    h.avn.set_service_state(PROJECT, "pg-main", "REBALANCING");
    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::Reconciling);

    let stored = h.stored(&key);
    assert!(!stored.is_instance_running());
    assert_eq!(h.condition(&key, ConditionType::Running).unwrap().status, ConditionStatus::Unknown);
    assert_eq!(
        h.condition(&key, ConditionType::Initialized).unwrap().status,
        ConditionStatus::True
    );
}

#[tokio::test]
async fn test_read_replica_waits_for_primary() {
    let h = Harness::new(ServiceHandler::<PostgreSql>::new());
    let mut replica = postgres("pg-replica");
    replica.spec.common.service_integrations = vec![ServiceIntegrationItem {
        integration_type: "read_replica".to_string(),
        source_service_name: "pg-primary".to_string(),
    }];
    let key = h.insert(&replica);

    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::PreconditionsPending);
    assert_eq!(h.avn.calls(Operation::CreateService), 0);

    h.avn.put_running_service(PROJECT, "pg-primary", "pg");
    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::Reconciling);
    assert!(h.avn.service(PROJECT, "pg-replica").is_some());
}

#[tokio::test]
async fn test_protected_service_survives_delete_request() {
    let h = Harness::new(ServiceHandler::<PostgreSql>::new());
    let mut pg = postgres("pg-main");
    pg.spec.common.termination_protection = Some(true);
    let key = h.insert(&pg);
    h.pass(&key).await.unwrap();

    h.store.request_deletion::<PostgreSql>(&key);
    h.pass(&key).await.unwrap_err();

    assert!(h.avn.service(PROJECT, "pg-main").is_some());
    assert_eq!(h.avn.calls(Operation::DeleteService), 0);
    assert_eq!(h.condition(&key, ConditionType::Running).unwrap().status, ConditionStatus::False);
}

#[tokio::test]
async fn test_kafka_acl_replaced_on_topic_change() {
    let h = Harness::new(KafkaAclHandler);
    h.avn.put_running_service(PROJECT, "events", "kafka");
    let key = h.insert(&kafka_acl("reader", "events", "orders"));

    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::Running);
    let first_id = h.stored(&key).remote_id().unwrap().to_string();

    assert!(h.store.update_spec::<KafkaAcl>(&key, |acl| acl.spec.topic = "payments".to_string()));
    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::Running);

    let acls = h.avn.kafka_acls(PROJECT, "events");
    assert_eq!(acls.len(), 1);
    assert_eq!(acls[0].topic, "payments");
    assert_ne!(h.stored(&key).remote_id(), Some(first_id.as_str()));

    h.store.request_deletion::<KafkaAcl>(&key);
    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::Gone);
    assert!(h.avn.kafka_acls(PROJECT, "events").is_empty());
}
