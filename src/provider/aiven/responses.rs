//! Response envelopes of the Aiven REST API.

use crate::provider::types::{DatabaseInfo, KafkaAclInfo, ProjectVpcInfo, ServiceInfo, ServiceIntegrationInfo};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct ServiceEnvelope {
    pub service: ServiceInfo,
}

#[derive(Debug, Deserialize)]
pub(super) struct DatabaseListEnvelope {
    #[serde(default)]
    pub databases: Vec<DatabaseInfo>,
}

#[derive(Debug, Deserialize)]
pub(super) struct KafkaAclListEnvelope {
    #[serde(default)]
    pub acl: Vec<KafkaAclInfo>,
}

#[derive(Debug, Deserialize)]
pub(super) struct IntegrationEnvelope {
    pub service_integration: ServiceIntegrationInfo,
}

#[derive(Debug, Deserialize)]
pub(super) struct IntegrationListEnvelope {
    #[serde(default)]
    pub service_integrations: Vec<ServiceIntegrationInfo>,
}

#[derive(Debug, Deserialize)]
pub(super) struct VpcListEnvelope {
    #[serde(default)]
    pub vpcs: Vec<ProjectVpcInfo>,
}

/// Error body: `{"message": "...", "errors": [{"message": "...", "status": 404}]}`
#[derive(Debug, Default, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorItem {
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Best human-readable message of an error answer
    pub(super) fn message_from(body: &str) -> String {
        let parsed: Self = serde_json::from_str(body).unwrap_or_default();
        parsed
            .message
            .or_else(|| parsed.errors.into_iter().find_map(|e| e.message))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.trim().to_string())
    }
}
