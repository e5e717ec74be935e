//! # Aiven API Types
//!
//! Request and response payloads of the Aiven REST API v1, limited to the fields
//! the operator reads or writes.
//!
//! API Reference: https://api.aiven.io/doc/

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A managed service as returned by `GET /project/{project}/service/{service}`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ServiceInfo {
    pub service_name: String,
    pub service_type: String,
    /// `POWEROFF`, `REBUILDING`, `REBALANCING` or `RUNNING`
    pub state: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default)]
    pub project_vpc_id: Option<String>,
    #[serde(default)]
    pub termination_protection: bool,
    #[serde(default)]
    pub service_uri: Option<String>,
    #[serde(default)]
    pub service_uri_params: BTreeMap<String, String>,
    #[serde(default)]
    pub connection_info: Map<String, Value>,
    #[serde(default)]
    pub users: Vec<ServiceUser>,
}

impl ServiceInfo {
    /// First service user, normally `avnadmin`
    #[must_use]
    pub fn primary_user(&self) -> Option<&ServiceUser> {
        self.users
            .iter()
            .find(|u| u.username == "avnadmin")
            .or_else(|| self.users.first())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceUser {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub access_cert: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MaintenanceWindow {
    pub dow: String,
    pub time: String,
}

/// Integration requested together with a new service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewServiceIntegration {
    pub integration_type: String,
    pub source_service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_project: Option<String>,
}

/// Body of `POST /project/{project}/service`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    pub service_name: String,
    pub service_type: String,
    pub plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_space_mb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<MaintenanceWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_vpc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_integrations: Vec<NewServiceIntegration>,
    pub termination_protection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_config: Option<Map<String, Value>>,
}

/// Body of `PUT /project/{project}/service/{service}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateServiceRequest {
    pub powered: bool,
    pub plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_space_mb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<MaintenanceWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_vpc_id: Option<String>,
    pub termination_protection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_config: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatabaseInfo {
    pub database_name: String,
    #[serde(default)]
    pub lc_collate: Option<String>,
    #[serde(default)]
    pub lc_ctype: Option<String>,
}

/// Body of `POST /project/{project}/service/{service}/db`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CreateDatabaseRequest {
    pub database: String,
    pub lc_collate: String,
    pub lc_ctype: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct KafkaAclInfo {
    pub id: String,
    pub permission: String,
    pub topic: String,
    pub username: String,
}

/// Body of `POST /project/{project}/service/{service}/acl`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CreateKafkaAclRequest {
    pub permission: String,
    pub topic: String,
    pub username: String,
}

impl CreateKafkaAclRequest {
    /// Whether an existing entry grants exactly this request
    #[must_use]
    pub fn matches(&self, acl: &KafkaAclInfo) -> bool {
        acl.topic == self.topic && acl.username == self.username && acl.permission == self.permission
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ServiceIntegrationInfo {
    pub service_integration_id: String,
    pub integration_type: String,
    #[serde(default)]
    pub source_project: Option<String>,
    #[serde(default)]
    pub source_service: Option<String>,
    #[serde(default)]
    pub dest_project: Option<String>,
    #[serde(default)]
    pub dest_service: Option<String>,
    #[serde(default)]
    pub source_endpoint_id: Option<String>,
    #[serde(default)]
    pub dest_endpoint_id: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub user_config: Map<String, Value>,
}

/// Body of `POST /project/{project}/integration`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CreateServiceIntegrationRequest {
    pub integration_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_endpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_endpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_config: Option<Map<String, Value>>,
}

impl CreateServiceIntegrationRequest {
    /// Whether an existing integration connects the same endpoints with the same type
    #[must_use]
    pub fn matches(&self, existing: &ServiceIntegrationInfo) -> bool {
        existing.integration_type == self.integration_type
            && existing.source_service == self.source_service
            && existing.dest_service == self.dest_service
            && existing.source_endpoint_id == self.source_endpoint_id
            && existing.dest_endpoint_id == self.dest_endpoint_id
    }
}

/// Body of `PUT /project/{project}/integration/{integration_id}`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UpdateServiceIntegrationRequest {
    pub user_config: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProjectVpcInfo {
    pub project_vpc_id: String,
    pub cloud_name: String,
    pub network_cidr: String,
    /// `APPROVED`, `ACTIVE`, `DELETING` or `DELETED`
    pub state: String,
}

/// Body of `POST /project/{project}/vpcs`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CreateProjectVpcRequest {
    pub cloud_name: String,
    pub network_cidr: String,
}
