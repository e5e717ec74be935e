//! # KafkaACL
//!
//! Access control entry on an Aiven for Apache Kafka service.

use super::status::{AuthSecretReference, ResourceStatus};
use super::ManagedResource;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "KafkaACL",
    root = "KafkaAcl",
    group = "aiven.io",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    printcolumn = r#"{"name":"Service Name", "type":"string", "jsonPath":".spec.serviceName"}, {"name":"Topic", "type":"string", "jsonPath":".spec.topic"}, {"name":"Username", "type":"string", "jsonPath":".spec.username"}, {"name":"Permission", "type":"string", "jsonPath":".spec.permission"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KafkaAclSpec {
    pub project: String,
    pub service_name: String,
    /// Topic name pattern for the ACL entry
    pub topic: String,
    /// Username pattern for the ACL entry
    pub username: String,
    pub permission: KafkaAclPermission,
    #[serde(default)]
    pub auth_secret_ref: Option<AuthSecretReference>,
}

/// Kafka permission granted by an ACL entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum KafkaAclPermission {
    Admin,
    Read,
    Readwrite,
    Write,
}

impl KafkaAclPermission {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Read => "read",
            Self::Readwrite => "readwrite",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for KafkaAclPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ManagedResource for KafkaAcl {
    fn auth_secret_ref(&self) -> Option<&AuthSecretReference> {
        self.spec.auth_secret_ref.as_ref()
    }
}
