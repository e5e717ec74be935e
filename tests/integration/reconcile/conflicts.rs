//! Optimistic concurrency: stale writes restart the pass from a fresh read.

use super::{database, project_vpc, Harness, PROJECT};
use aiven_operator::constants::{DELETION_FINALIZER, MAX_CONFLICT_RETRIES};
use aiven_operator::controller::handler::{DatabaseHandler, ProjectVpcHandler};
use aiven_operator::controller::reconciler::{ReconcileError, RetryPolicy};
use aiven_operator::controller::Phase;
use aiven_operator::crd::ManagedResource;
use aiven_operator::provider::memory::Operation;
use aiven_operator::provider::ControlPlane;

#[tokio::test]
async fn test_conflicting_writes_restart_the_pass() {
    let h = Harness::new(DatabaseHandler);
    h.avn.put_running_service(PROJECT, "pg-main", "pg");
    let key = h.insert(&database("orders", "pg-main"));

    h.store.inject_conflicts(2);
    let outcome = h.pass(&key).await.unwrap();

    assert_eq!(outcome.phase, Phase::Running);
    assert_eq!(h.avn.calls(Operation::CreateDatabase), 1);
}

#[tokio::test]
async fn test_gives_up_after_repeated_conflicts() {
    let h = Harness::new(DatabaseHandler);
    h.avn.put_running_service(PROJECT, "pg-main", "pg");
    let key = h.insert(&database("orders", "pg-main"));

    h.store.inject_conflicts(MAX_CONFLICT_RETRIES + 5);
    let error = h.pass(&key).await.unwrap_err();

    match &error {
        ReconcileError::ConflictRetriesExhausted { key: k, attempts } => {
            assert_eq!(k, "shop/orders");
            assert_eq!(*attempts, MAX_CONFLICT_RETRIES + 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(error.retry_policy(), RetryPolicy::Backoff);
    // Every attempt failed before touching Aiven
    assert_eq!(h.avn.calls(Operation::CreateDatabase), 0);
}

#[tokio::test]
async fn test_edit_between_passes_is_picked_up() {
    let h = Harness::new(DatabaseHandler);
    h.avn.put_running_service(PROJECT, "pg-main", "pg");
    let key = h.insert(&database("orders", "pg-main"));
    h.pass(&key).await.unwrap();

    assert!(h
        .store
        .update_spec::<aiven_operator::Database>(&key, |db| db.spec.lc_collate = "C".to_string()));
    // Lands on the marker write after createOrUpdate
    h.store.inject_conflicts(1);
    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::Running);
    assert_eq!(h.avn.calls(Operation::CreateDatabase), 1);
    assert_eq!(
        h.stored(&key)
            .metadata
            .annotations
            .unwrap_or_default()
            .get(aiven_operator::constants::PROCESSED_GENERATION_ANNOTATION)
            .map(String::as_str),
        Some("2")
    );
}

#[tokio::test]
async fn test_conflict_after_vpc_create_adopts_it() {
    let h = Harness::new(ProjectVpcHandler);
    let mut vpc = project_vpc("vpc-main");
    vpc.metadata.finalizers = Some(vec![DELETION_FINALIZER.to_string()]);
    let key = h.insert(&vpc);

    // The first write of the pass is the one recording the new VPC
    h.store.inject_conflicts(1);
    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::Reconciling);

    assert_eq!(h.avn.calls(Operation::CreateProjectVpc), 1);
    let remote = h.avn.list_project_vpcs(PROJECT).await.unwrap();
    assert_eq!(remote.len(), 1);
    assert_eq!(
        h.stored(&key).remote_id(),
        Some(remote[0].project_vpc_id.as_str())
    );
}
