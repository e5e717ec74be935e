//! # PostgreSQL
//!
//! Aiven for PostgreSQL service.

use super::service::{ServiceCommonSpec, UserConfig};
use super::status::{AuthSecretReference, ConnInfoSecretTarget, ResourceStatus};
use super::ManagedResource;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// PostgreSQL Custom Resource Definition
///
/// Connection details are written to `connInfoSecretTarget` (or a secret named after
/// the resource) once the service reports `RUNNING`.
///
/// # Example
///
/// ```yaml
/// apiVersion: aiven.io/v1alpha1
/// kind: PostgreSQL
/// metadata:
///   name: my-pg
/// spec:
///   project: my-project
///   plan: startup-4
///   cloudName: google-europe-west1
///   diskSpace: 80GiB
///   userConfig:
///     pg_version: "16"
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "PostgreSQL",
    root = "PostgreSql",
    group = "aiven.io",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    shortname = "pg",
    printcolumn = r#"{"name":"Project", "type":"string", "jsonPath":".spec.project"}, {"name":"Plan", "type":"string", "jsonPath":".spec.plan"}, {"name":"State", "type":"string", "jsonPath":".status.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PostgreSqlSpec {
    #[serde(flatten)]
    pub common: ServiceCommonSpec,
    /// Disk space, e.g. `80GiB`; defaults to the plan's allocation
    #[serde(default)]
    pub disk_space: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_config: Option<UserConfig>,
}

impl ManagedResource for PostgreSql {
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
