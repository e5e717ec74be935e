//! # Database
//!
//! A logical database inside an Aiven PostgreSQL (or MySQL) service.

use super::status::{AuthSecretReference, ResourceStatus};
use super::ManagedResource;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Database Custom Resource Definition
///
/// The remote database is named after the resource.
///
/// # Example
///
/// ```yaml
/// apiVersion: aiven.io/v1alpha1
/// kind: Database
/// metadata:
///   name: orders
/// spec:
///   project: my-project
///   serviceName: my-pg
///   authSecretRef:
///     name: aiven-token
///     key: token
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Database",
    group = "aiven.io",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    shortname = "avndb",
    printcolumn = r#"{"name":"Project", "type":"string", "jsonPath":".spec.project"}, {"name":"Service Name", "type":"string", "jsonPath":".spec.serviceName"}, {"name":"Running", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Running\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    /// Project to link the database to
    pub project: String,
    /// PostgreSQL service to link the database to
    pub service_name: String,
    /// Default string sort order (`LC_COLLATE`)
    #[serde(default = "default_locale")]
    pub lc_collate: String,
    /// Default character classification (`LC_CTYPE`)
    #[serde(default = "default_locale")]
    pub lc_ctype: String,
    /// Prevent the remote database from being deleted
    #[serde(default)]
    pub termination_protection: Option<bool>,
    #[serde(default)]
    pub auth_secret_ref: Option<AuthSecretReference>,
}

fn default_locale() -> String {
    "en_US.UTF-8".to_string()
}

impl ManagedResource for Database {
    fn auth_secret_ref(&self) -> Option<&AuthSecretReference> {
        self.spec.auth_secret_ref.as_ref()
    }

    fn termination_protection(&self) -> bool {
        self.spec.termination_protection.unwrap_or(false)
    }
}
