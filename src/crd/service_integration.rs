//! # ServiceIntegration
//!
//! Integration between two Aiven services or a service and an external endpoint.

use super::service::UserConfig;
use super::status::{AuthSecretReference, ResourceStatus};
use super::ManagedResource;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ServiceIntegration",
    group = "aiven.io",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    shortname = "avnsi",
    printcolumn = r#"{"name":"Project", "type":"string", "jsonPath":".spec.project"}, {"name":"Type", "type":"string", "jsonPath":".spec.integrationType"}, {"name":"Source Service Name", "type":"string", "jsonPath":".spec.sourceServiceName"}, {"name":"Destination Service Name", "type":"string", "jsonPath":".spec.destinationServiceName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceIntegrationSpec {
    /// Project the integration belongs to
    pub project: String,
    /// Integration type, e.g. `kafka_logs`, `metrics`, `read_replica`
    pub integration_type: String,
    #[serde(default)]
    pub source_service_name: Option<String>,
    #[serde(default)]
    pub destination_service_name: Option<String>,
    /// Project of the source service, defaults to `project`
    #[serde(default)]
    pub source_project_name: Option<String>,
    /// Project of the destination service, defaults to `project`
    #[serde(default)]
    pub destination_project_name: Option<String>,
    #[serde(default)]
    pub source_endpoint_id: Option<String>,
    #[serde(default)]
    pub destination_endpoint_id: Option<String>,
    /// Integration-type specific settings, passed through to Aiven
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_config: Option<UserConfig>,
    #[serde(default)]
    pub auth_secret_ref: Option<AuthSecretReference>,
}

impl ServiceIntegrationSpec {
    #[must_use]
    pub fn source_project(&self) -> &str {
        self.source_project_name
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.project)
    }

    #[must_use]
    pub fn destination_project(&self) -> &str {
        self.destination_project_name
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.project)
    }
}

impl ManagedResource for ServiceIntegration {
    fn auth_secret_ref(&self) -> Option<&AuthSecretReference> {
        self.spec.auth_secret_ref.as_ref()
    }
}
