//! # Kafka
//!
//! Aiven for Apache Kafka service.

use super::service::{ServiceCommonSpec, UserConfig};
use super::status::{AuthSecretReference, ConnInfoSecretTarget, ResourceStatus};
use super::ManagedResource;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Kafka",
    group = "aiven.io",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    printcolumn = r#"{"name":"Project", "type":"string", "jsonPath":".spec.project"}, {"name":"Plan", "type":"string", "jsonPath":".spec.plan"}, {"name":"State", "type":"string", "jsonPath":".status.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KafkaSpec {
    #[serde(flatten)]
    pub common: ServiceCommonSpec,
    #[serde(default)]
    pub disk_space: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_config: Option<UserConfig>,
}

impl ManagedResource for Kafka {
    fn auth_secret_ref(&self) -> Option<&AuthSecretReference> {
        self.spec.common.auth_secret_ref.as_ref()
    }

    fn termination_protection(&self) -> bool {
        self.spec.common.termination_protection.unwrap_or(false)
    }

    fn conn_info_secret_target(&self) -> Option<&ConnInfoSecretTarget> {
        self.spec.common.conn_info_secret_target.as_ref()
    }
}
