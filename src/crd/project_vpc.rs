//! # ProjectVPC
//!
//! A VPC in an Aiven project, referenced by services for network placement.

use super::status::{AuthSecretReference, ResourceStatus};
use super::ManagedResource;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ProjectVPC",
    root = "ProjectVpc",
    group = "aiven.io",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    printcolumn = r#"{"name":"Project", "type":"string", "jsonPath":".spec.project"}, {"name":"Cloud", "type":"string", "jsonPath":".spec.cloudName"}, {"name":"Network CIDR", "type":"string", "jsonPath":".spec.networkCidr"}, {"name":"State", "type":"string", "jsonPath":".status.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVpcSpec {
    pub project: String,
    /// Cloud the VPC lives in, e.g. `google-europe-west1`
    pub cloud_name: String,
    /// IPv4 network range CIDR
    pub network_cidr: String,
    #[serde(default)]
    pub auth_secret_ref: Option<AuthSecretReference>,
}

impl ManagedResource for ProjectVpc {
    fn auth_secret_ref(&self) -> Option<&AuthSecretReference> {
        self.spec.auth_secret_ref.as_ref()
    }
}
