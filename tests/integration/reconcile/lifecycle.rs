//! Create, poll and re-apply: the path of a resource that never gets deleted.

use super::{database, Harness, PROJECT};
use aiven_operator::constants::{DELETION_FINALIZER, PROCESSED_GENERATION_ANNOTATION};
use aiven_operator::controller::handler::DatabaseHandler;
use aiven_operator::controller::reconciler::{ReconcileError, RetryPolicy};
use aiven_operator::controller::Phase;
use aiven_operator::crd::{ConditionStatus, ConditionType, ManagedResource};
use aiven_operator::provider::memory::Operation;
use aiven_operator::provider::AivenError;
use aiven_operator::Database;
use kube::{Resource, ResourceExt};
use std::time::Duration;

fn marker(db: &Database) -> Option<String> {
    db.annotations().get(PROCESSED_GENERATION_ANNOTATION).cloned()
}

#[tokio::test]
async fn test_waits_for_service_then_runs() {
    let h = Harness::new(DatabaseHandler);
    let key = h.insert(&database("orders", "pg-main"));

    let outcome = h.pass(&key).await.unwrap();
    assert_eq!(outcome.phase, Phase::PreconditionsPending);
    assert_eq!(outcome.requeue_after, Some(Duration::from_secs(10)));

    let stored = h.stored(&key);
    assert!(stored.finalizers().iter().any(|f| f == DELETION_FINALIZER));
    let initialized = h.condition(&key, ConditionType::Initialized).unwrap();
    assert_eq!(initialized.status, ConditionStatus::Unknown);
    assert_eq!(initialized.reason.as_deref(), Some("Preconditions"));
    assert_eq!(h.avn.calls(Operation::CreateDatabase), 0);
    assert_eq!(marker(&stored), None);

    h.avn.put_running_service(PROJECT, "pg-main", "pg");
    let outcome = h.pass(&key).await.unwrap();
    assert_eq!(outcome.phase, Phase::Running);
    assert_eq!(outcome.requeue_after, Some(Duration::from_secs(300)));

    let stored = h.stored(&key);
    assert_eq!(h.avn.databases(PROJECT, "pg-main"), vec!["orders".to_string()]);
    assert_eq!(marker(&stored).as_deref(), Some("1"));
    assert!(stored.is_instance_running());
    assert_eq!(
        h.condition(&key, ConditionType::Initialized).unwrap().status,
        ConditionStatus::True
    );
    assert_eq!(h.condition(&key, ConditionType::Running).unwrap().status, ConditionStatus::True);
    assert_eq!(Phase::of(&stored), Phase::Running);
}

#[tokio::test]
async fn test_steady_state_pass_writes_nothing() {
    let h = Harness::new(DatabaseHandler);
    h.avn.put_running_service(PROJECT, "pg-main", "pg");
    let key = h.insert(&database("orders", "pg-main"));
    h.pass(&key).await.unwrap();

    let before = h.stored(&key).resource_version();
    let outcome = h.pass(&key).await.unwrap();

    assert_eq!(outcome.phase, Phase::Running);
    assert_eq!(h.stored(&key).resource_version(), before);
    assert_eq!(h.avn.calls(Operation::CreateDatabase), 1);
}

#[tokio::test]
async fn test_spec_change_is_applied_once() {
    let h = Harness::new(DatabaseHandler);
    h.avn.put_running_service(PROJECT, "pg-main", "pg");
    let key = h.insert(&database("orders", "pg-main"));
    h.pass(&key).await.unwrap();
    let gets_after_create = h.avn.calls(Operation::GetDatabase);

    assert!(h.store.update_spec::<Database>(&key, |db| db.spec.lc_ctype = "C".to_string()));
    h.pass(&key).await.unwrap();

    let stored = h.stored(&key);
    assert_eq!(stored.meta().generation, Some(2));
    assert_eq!(marker(&stored).as_deref(), Some("2"));
    // Existing database adopted: one lookup for createOrUpdate, one poll
    assert_eq!(h.avn.calls(Operation::GetDatabase), gets_after_create + 2);
    assert_eq!(h.avn.calls(Operation::CreateDatabase), 1);
    assert_eq!(
        h.condition(&key, ConditionType::Initialized).unwrap().reason.as_deref(),
        Some("Updated")
    );
}

#[tokio::test]
async fn test_remote_drift_is_recreated() {
    let h = Harness::new(DatabaseHandler);
    h.avn.put_running_service(PROJECT, "pg-main", "pg");
    let key = h.insert(&database("orders", "pg-main"));
    h.pass(&key).await.unwrap();

    h.avn.remove_database(PROJECT, "pg-main", "orders");
    let error = h.pass(&key).await.unwrap_err();
    assert!(matches!(&error, ReconcileError::Handler(e) if e.is_not_found()));
    assert_eq!(error.retry_policy(), RetryPolicy::Backoff);

    let stored = h.stored(&key);
    assert_eq!(marker(&stored), None);
    assert!(!stored.is_instance_running());
    let running = h.condition(&key, ConditionType::Running).unwrap();
    assert_eq!(running.status, ConditionStatus::Unknown);
    assert_eq!(running.reason.as_deref(), Some("CheckRunningError"));

    let outcome = h.pass(&key).await.unwrap();
    assert_eq!(outcome.phase, Phase::Running);
    assert_eq!(h.avn.databases(PROJECT, "pg-main"), vec!["orders".to_string()]);
    assert_eq!(h.avn.calls(Operation::CreateDatabase), 2);
}

#[tokio::test]
async fn test_create_failure_marks_initialized_false() {
    let h = Harness::new(DatabaseHandler);
    h.avn.put_running_service(PROJECT, "pg-main", "pg");
    h.avn.fail_next(
        Operation::CreateDatabase,
        AivenError::Api {
            status: 400,
            message: "invalid locale".to_string(),
        },
    );
    let key = h.insert(&database("orders", "pg-main"));

    let error = h.pass(&key).await.unwrap_err();
    assert_eq!(error.class(), "api");

    let initialized = h.condition(&key, ConditionType::Initialized).unwrap();
    assert_eq!(initialized.status, ConditionStatus::False);
    assert_eq!(initialized.reason.as_deref(), Some("CreateOrUpdateError"));
    assert!(initialized.message.unwrap_or_default().contains("invalid locale"));
    assert_eq!(marker(&h.stored(&key)), None);

    let outcome = h.pass(&key).await.unwrap();
    assert_eq!(outcome.phase, Phase::Running);
    assert_eq!(
        h.condition(&key, ConditionType::Initialized).unwrap().status,
        ConditionStatus::True
    );
}

#[tokio::test]
async fn test_successful_pass_resets_backoff() {
    let h = Harness::new(DatabaseHandler);
    h.avn.put_running_service(PROJECT, "pg-main", "pg");
    h.avn.fail_next(Operation::CreateDatabase, AivenError::Transient("HTTP 503".to_string()));
    let key = h.insert(&database("orders", "pg-main"));

    h.pass(&key).await.unwrap_err();
    let (first, count) = h.reconciler.next_backoff(&key);
    assert_eq!((first, count), (Duration::from_secs(5), 1));

    h.pass(&key).await.unwrap();
    assert!(h.reconciler.backoff_states.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_repeated_create_failure_keeps_transition_time() {
    let h = Harness::new(DatabaseHandler);
    h.avn.put_running_service(PROJECT, "pg-main", "pg");
    let key = h.insert(&database("orders", "pg-main"));
    let rejected = || AivenError::Api {
        status: 400,
        message: "invalid collation".to_string(),
    };

    h.avn.fail_next(Operation::CreateDatabase, rejected());
    h.pass(&key).await.unwrap_err();
    let first = h.condition(&key, ConditionType::Initialized).unwrap();
    assert_eq!(first.status, ConditionStatus::False);
    let version = h.stored(&key).resource_version();

    tokio::time::sleep(Duration::from_millis(20)).await;
    h.avn.fail_next(Operation::CreateDatabase, rejected());
    h.pass(&key).await.unwrap_err();
    let second = h.condition(&key, ConditionType::Initialized).unwrap();

    assert_eq!(second.status, ConditionStatus::False);
    assert_eq!(second.last_transition_time, first.last_transition_time);
    // Same condition, nothing to write
    assert_eq!(h.stored(&key).resource_version(), version);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_create_times_out_and_recovers() {
    let h = Harness::new(DatabaseHandler);
    h.avn.put_running_service(PROJECT, "pg-main", "pg");
    h.avn.set_latency(Operation::CreateDatabase, Duration::from_secs(60));
    let key = h.insert(&database("orders", "pg-main"));

    let error = h.pass(&key).await.unwrap_err();
    assert!(matches!(error, ReconcileError::Timeout { .. }), "{error}");
    assert_eq!(error.retry_policy(), RetryPolicy::Backoff);

    let stored = h.stored(&key);
    assert!(stored.finalizers().contains(&DELETION_FINALIZER.to_string()));
    assert_eq!(marker(&stored), None);
    assert_eq!(h.avn.calls(Operation::CreateDatabase), 0);

    h.avn.set_latency(Operation::CreateDatabase, Duration::ZERO);
    let outcome = h.pass(&key).await.unwrap();
    assert_eq!(outcome.phase, Phase::Running);
    assert_eq!(marker(&h.stored(&key)).as_deref(), Some("1"));
    assert_eq!(h.avn.calls(Operation::CreateDatabase), 1);
}
