//! A database reconciled end to end over HTTP, with its token read from a secret.

use super::mock_server::{self, MockAiven, TOKEN};
use aiven_operator::config::ControllerConfig;
use aiven_operator::controller::handler::DatabaseHandler;
use aiven_operator::controller::reconciler::ReconcileError;
use aiven_operator::controller::store::{MemoryStore, ObjectStore};
use aiven_operator::controller::{Phase, Reconciler, ResourceKey};
use aiven_operator::crd::{AuthSecretReference, DatabaseSpec, ManagedResource};
use aiven_operator::provider::aiven::build_http_client;
use aiven_operator::provider::memory::Operation;
use aiven_operator::provider::{CredentialsError, TokenClientFactory};
use aiven_operator::Database;
use k8s_openapi::api::core::v1::Secret;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const NAMESPACE: &str = "shop";
const PROJECT: &str = "acme";

fn token_secret(name: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..ObjectMeta::default()
        },
        string_data: Some(BTreeMap::from([("token".to_string(), TOKEN.to_string())])),
        ..Secret::default()
    }
}

fn database(name: &str, secret: &str) -> Database {
    let mut db = Database::new(
        name,
        DatabaseSpec {
            project: PROJECT.to_string(),
            service_name: "pg-main".to_string(),
            lc_collate: "en_US.UTF-8".to_string(),
            lc_ctype: "en_US.UTF-8".to_string(),
            termination_protection: None,
            auth_secret_ref: Some(AuthSecretReference {
                name: secret.to_string(),
                key: "token".to_string(),
            }),
        },
    );
    db.metadata.namespace = Some(NAMESPACE.to_string());
    db.metadata.uid = Some("uid-database".to_string());
    db
}

fn reconciler(server: &MockAiven, store: &Arc<MemoryStore>) -> Reconciler<DatabaseHandler> {
    let object_store: Arc<dyn ObjectStore> = Arc::clone(store) as Arc<dyn ObjectStore>;
    let http = build_http_client(Duration::from_secs(5)).unwrap();
    let clients = TokenClientFactory::new(Arc::clone(&object_store), http, server.base_url.clone(), None);
    let config = ControllerConfig {
        reconcile_timeout: Duration::from_secs(10),
        ..ControllerConfig::default()
    };
    Reconciler::new(DatabaseHandler, object_store, Arc::new(clients), config)
}

#[tokio::test]
async fn test_database_reconciled_over_http() {
    let server = mock_server::start().await;
    server.avn.put_running_service(PROJECT, "pg-main", "pg");
    let store = Arc::new(MemoryStore::new());
    store.insert_secret(token_secret("aiven-token"));
    let reconciler = reconciler(&server, &store);

    let key: ResourceKey = store.insert(&database("orders", "aiven-token")).unwrap();
    let outcome = reconciler.reconcile(&key).await.unwrap();
    assert_eq!(outcome.phase, Phase::Running);
    assert_eq!(server.avn.databases(PROJECT, "pg-main"), vec!["orders".to_string()]);
    assert!(store.get_typed::<Database>(&key).unwrap().is_instance_running());

    store.request_deletion::<Database>(&key);
    let outcome = reconciler.reconcile(&key).await.unwrap();
    assert_eq!(outcome.phase, Phase::Gone);
    assert!(server.avn.databases(PROJECT, "pg-main").is_empty());
    assert!(!store.contains::<Database>(&key));
}

#[tokio::test]
async fn test_missing_token_secret_stops_before_any_call() {
    let server = mock_server::start().await;
    server.avn.put_running_service(PROJECT, "pg-main", "pg");
    let store = Arc::new(MemoryStore::new());
    let reconciler = reconciler(&server, &store);

    let key = store.insert(&database("orders", "absent")).unwrap();
    let error = reconciler.reconcile(&key).await.unwrap_err();
    assert!(
        matches!(
            error,
            ReconcileError::Credentials(CredentialsError::SecretNotFound { ref name, .. }) if name == "absent"
        ),
        "got {error:?}"
    );
    assert_eq!(server.avn.calls(Operation::GetService), 0);
    assert_eq!(server.avn.calls(Operation::CreateDatabase), 0);
}
