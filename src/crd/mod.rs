//! # Custom Resource Definitions
//!
//! Aiven resource kinds served under `aiven.io/v1alpha1`.
//!
//! Every kind shares [`ResourceStatus`] and implements [`ManagedResource`], which is
//! all the reconciliation engine needs to know about it.

mod clickhouse;
mod condition;
mod database;
mod kafka;
mod kafka_acl;
mod postgresql;
mod project_vpc;
mod service;
mod service_integration;
mod status;

pub use clickhouse::{Clickhouse, ClickhouseSpec};
pub use condition::{
    find_condition, is_condition_true, set_condition, set_condition_at, Condition,
    ConditionReason, ConditionStatus, ConditionType,
};
pub use database::{Database, DatabaseSpec};
pub use kafka::{Kafka, KafkaSpec};
pub use kafka_acl::{KafkaAcl, KafkaAclPermission, KafkaAclSpec};
pub use postgresql::{PostgreSql, PostgreSqlSpec};
pub use project_vpc::{ProjectVpc, ProjectVpcSpec};
pub use service::{disk_space_to_mib, ServiceCommonSpec, ServiceIntegrationItem, UserConfig};
pub use service_integration::{ServiceIntegration, ServiceIntegrationSpec};
pub use status::{AuthSecretReference, ConnInfoSecretTarget, ResourceReference, ResourceStatus};

use kube::core::object::HasStatus;
use kube::core::NamespaceResourceScope;
use kube::{CustomResourceExt, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// API group of every Aiven kind
pub const API_GROUP: &str = "aiven.io";

/// API version of every Aiven kind
pub const API_VERSION: &str = "v1alpha1";

/// A namespaced Aiven custom resource the engine can reconcile
pub trait ManagedResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + HasStatus<Status = ResourceStatus>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Secret holding the Aiven token for this resource
    fn auth_secret_ref(&self) -> Option<&AuthSecretReference>;

    /// Remote deletion is refused while this is set
    fn termination_protection(&self) -> bool {
        false
    }

    /// Where connection credentials go, when the kind produces any
    fn conn_info_secret_target(&self) -> Option<&ConnInfoSecretTarget> {
        None
    }

    /// Current conditions, empty when no status was written yet
    fn conditions(&self) -> &[Condition] {
        self.status().map_or(&[], |s| s.conditions.as_slice())
    }

    /// Remote identifier recorded in status
    fn remote_id(&self) -> Option<&str> {
        self.status()
            .and_then(|s| s.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Whether a poll has confirmed the remote resource running
    fn is_instance_running(&self) -> bool {
        self.status().is_some_and(|s| s.instance_running)
    }

    /// Status document, created empty when missing
    fn status_or_default(&mut self) -> &mut ResourceStatus {
        self.status_mut().get_or_insert_with(ResourceStatus::default)
    }
}

/// Every CRD served by the operator
#[must_use]
pub fn all_crds() -> Vec<k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition> {
    vec![
        Database::crd(),
        KafkaAcl::crd(),
        ServiceIntegration::crd(),
        ProjectVpc::crd(),
        PostgreSql::crd(),
        Kafka::crd(),
        Clickhouse::crd(),
    ]
}
