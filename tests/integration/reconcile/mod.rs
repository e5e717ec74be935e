//! Shared fixtures for reconciliation scenarios.

pub mod conflicts;
pub mod deletion;
pub mod lifecycle;
pub mod references;
pub mod services;

use aiven_operator::config::ControllerConfig;
use aiven_operator::controller::handler::Handler;
use aiven_operator::controller::reconciler::ReconcileError;
use aiven_operator::controller::store::{MemoryStore, ObjectStore};
use aiven_operator::controller::{Outcome, Reconciler, ResourceKey};
use aiven_operator::crd::{
    find_condition, Condition, ConditionType, DatabaseSpec, KafkaAclPermission, KafkaAclSpec, ManagedResource,
    PostgreSqlSpec, ProjectVpcSpec, ServiceCommonSpec,
};
use aiven_operator::provider::memory::MemoryControlPlane;
use aiven_operator::provider::{ControlPlane, StaticClientFactory};
use aiven_operator::{Database, KafkaAcl, PostgreSql, ProjectVpc};
use kube::Resource;
use std::sync::Arc;
use std::time::Duration;

pub const NAMESPACE: &str = "shop";
pub const PROJECT: &str = "acme";

/// One reconciler wired to in-memory collaborators
pub struct Harness<H: Handler> {
    pub store: Arc<MemoryStore>,
    pub avn: Arc<MemoryControlPlane>,
    pub reconciler: Reconciler<H>,
}

impl<H: Handler> Harness<H> {
    pub fn new(handler: H) -> Self {
        Self::with_collaborators(handler, Arc::new(MemoryStore::new()), Arc::new(MemoryControlPlane::new()))
    }

    /// Reconciler sharing the store and control plane of another harness
    pub fn with_collaborators(handler: H, store: Arc<MemoryStore>, avn: Arc<MemoryControlPlane>) -> Self {
        let config = ControllerConfig {
            requeue_interval: Duration::from_secs(10),
            poll_interval: Duration::from_secs(300),
            reconcile_timeout: Duration::from_secs(5),
            ..ControllerConfig::default()
        };
        let object_store: Arc<dyn ObjectStore> = Arc::clone(&store) as Arc<dyn ObjectStore>;
        let control_plane: Arc<dyn ControlPlane> = Arc::clone(&avn) as Arc<dyn ControlPlane>;
        let reconciler = Reconciler::new(
            handler,
            object_store,
            Arc::new(StaticClientFactory::new(control_plane)),
            config,
        );
        Self { store, avn, reconciler }
    }

    pub fn insert(&self, resource: &H::Kind) -> ResourceKey {
        self.store.insert(resource).unwrap()
    }

    pub async fn pass(&self, key: &ResourceKey) -> Result<Outcome, ReconcileError> {
        self.reconciler.reconcile(key).await
    }

    pub fn stored(&self, key: &ResourceKey) -> H::Kind {
        self.store.get_typed::<H::Kind>(key).unwrap()
    }

    pub fn condition(&self, key: &ResourceKey, r#type: ConditionType) -> Option<Condition> {
        find_condition(self.stored(key).conditions(), r#type).cloned()
    }
}

fn with_identity<K: ManagedResource>(mut resource: K, uid: &str) -> K {
    resource.meta_mut().namespace = Some(NAMESPACE.to_string());
    resource.meta_mut().uid = Some(uid.to_string());
    resource
}

pub fn database(name: &str, service: &str) -> Database {
    with_identity(
        Database::new(
            name,
            DatabaseSpec {
                project: PROJECT.to_string(),
                service_name: service.to_string(),
                lc_collate: "en_US.UTF-8".to_string(),
                lc_ctype: "en_US.UTF-8".to_string(),
                termination_protection: None,
                auth_secret_ref: None,
            },
        ),
        "uid-database",
    )
}

pub fn postgres(name: &str) -> PostgreSql {
    with_identity(
        PostgreSql::new(
            name,
            PostgreSqlSpec {
                common: ServiceCommonSpec {
                    project: PROJECT.to_string(),
                    plan: "startup-4".to_string(),
                    cloud_name: Some("google-europe-west1".to_string()),
                    ..ServiceCommonSpec::default()
                },
                disk_space: None,
                user_config: None,
            },
        ),
        "uid-postgres",
    )
}

pub fn kafka_acl(name: &str, service: &str, topic: &str) -> KafkaAcl {
    with_identity(
        KafkaAcl::new(
            name,
            KafkaAclSpec {
                project: PROJECT.to_string(),
                service_name: service.to_string(),
                topic: topic.to_string(),
                username: "reader".to_string(),
                permission: KafkaAclPermission::Read,
                auth_secret_ref: None,
            },
        ),
        "uid-acl",
    )
}

pub fn project_vpc(name: &str) -> ProjectVpc {
    with_identity(
        ProjectVpc::new(
            name,
            ProjectVpcSpec {
                project: PROJECT.to_string(),
                cloud_name: "google-europe-west1".to_string(),
                network_cidr: "10.10.0.0/24".to_string(),
                auth_secret_ref: None,
            },
        ),
        "uid-vpc",
    )
}
