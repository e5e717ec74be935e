//! The deletion protocol: remote first, then the finalizer.

use super::{database, Harness, PROJECT};
use aiven_operator::constants::DELETION_FINALIZER;
use aiven_operator::controller::handler::{DatabaseHandler, HandlerError};
use aiven_operator::controller::reconciler::{ReconcileError, RetryPolicy};
use aiven_operator::controller::Phase;
use aiven_operator::crd::{ConditionStatus, ConditionType};
use aiven_operator::provider::memory::Operation;
use aiven_operator::provider::AivenError;
use aiven_operator::Database;
use kube::ResourceExt;

fn running_database(h: &Harness<DatabaseHandler>, protected: bool) -> aiven_operator::controller::ResourceKey {
    h.avn.put_running_service(PROJECT, "pg-main", "pg");
    let mut db = database("orders", "pg-main");
    db.spec.termination_protection = Some(protected);
    h.insert(&db)
}

#[tokio::test]
async fn test_delete_removes_remote_then_object() {
    let h = Harness::new(DatabaseHandler);
    let key = running_database(&h, false);
    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::Running);

    h.store.request_deletion::<Database>(&key);
    assert!(h.store.contains::<Database>(&key));
    assert_eq!(Phase::of(&h.stored(&key)), Phase::DeletionPending);

    let outcome = h.pass(&key).await.unwrap();
    assert_eq!(outcome.phase, Phase::Gone);
    assert_eq!(outcome.requeue_after, None);
    assert!(!h.store.contains::<Database>(&key));
    assert!(h.avn.databases(PROJECT, "pg-main").is_empty());
    assert_eq!(h.avn.calls(Operation::DeleteDatabase), 1);
}

#[tokio::test]
async fn test_termination_protection_blocks_deletion() {
    let h = Harness::new(DatabaseHandler);
    let key = running_database(&h, true);
    h.pass(&key).await.unwrap();
    h.store.request_deletion::<Database>(&key);

    let error = h.pass(&key).await.unwrap_err();
    assert!(matches!(error, ReconcileError::Handler(HandlerError::TerminationProtected)));
    assert_eq!(error.retry_policy(), RetryPolicy::AwaitChange);

    let stored = h.stored(&key);
    assert!(stored.finalizers().iter().any(|f| f == DELETION_FINALIZER));
    let running = h.condition(&key, ConditionType::Running).unwrap();
    assert_eq!(running.status, ConditionStatus::False);
    assert_eq!(running.reason.as_deref(), Some("TerminationProtected"));
    assert_eq!(h.avn.calls(Operation::DeleteDatabase), 0);
    assert_eq!(h.avn.databases(PROJECT, "pg-main"), vec!["orders".to_string()]);

    assert!(h.store.update_spec::<Database>(&key, |db| db.spec.termination_protection = Some(false)));
    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::Gone);
    assert!(!h.store.contains::<Database>(&key));
    assert!(h.avn.databases(PROJECT, "pg-main").is_empty());
}

#[tokio::test]
async fn test_already_deleted_remote_releases_finalizer() {
    let h = Harness::new(DatabaseHandler);
    let key = running_database(&h, false);
    h.pass(&key).await.unwrap();

    h.avn.remove_database(PROJECT, "pg-main", "orders");
    h.store.request_deletion::<Database>(&key);

    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::Gone);
    assert!(!h.store.contains::<Database>(&key));
}

#[tokio::test]
async fn test_failed_remote_delete_keeps_finalizer() {
    let h = Harness::new(DatabaseHandler);
    let key = running_database(&h, false);
    h.pass(&key).await.unwrap();
    h.store.request_deletion::<Database>(&key);
    h.avn
        .fail_next(Operation::DeleteDatabase, AivenError::Transient("HTTP 502".to_string()));

    let error = h.pass(&key).await.unwrap_err();
    assert_eq!(error.class(), "transient");
    assert!(h.store.contains::<Database>(&key));
    assert!(h.stored(&key).finalizers().iter().any(|f| f == DELETION_FINALIZER));

    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::Gone);
    assert!(!h.store.contains::<Database>(&key));
}

#[tokio::test]
async fn test_never_reconciled_resource_is_gone_at_once() {
    let h = Harness::new(DatabaseHandler);
    let key = h.insert(&database("orders", "pg-main"));

    // No finalizer yet, so the API server removes the object immediately
    h.store.request_deletion::<Database>(&key);

    assert_eq!(h.pass(&key).await.unwrap().phase, Phase::Gone);
    assert_eq!(h.avn.calls(Operation::DeleteDatabase), 0);
}
