//! # Managed Service Spec
//!
//! Fields shared by every full managed-service kind (PostgreSQL, Kafka, Clickhouse).

use super::status::{AuthSecretReference, ConnInfoSecretTarget, ResourceReference};
use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Common configuration of a managed service
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCommonSpec {
    /// Target project
    pub project: String,
    /// Subscription plan, e.g. `startup-4`
    pub plan: String,
    /// Cloud the service runs in
    #[serde(default)]
    pub cloud_name: Option<String>,
    /// Identifier of the VPC the service should be placed in
    #[serde(default)]
    pub project_vpc_id: Option<String>,
    /// ProjectVPC resource supplying the VPC identifier when `projectVpcId` is empty
    #[serde(default)]
    pub project_vpc_ref: Option<ResourceReference>,
    /// Day of week for installing updates
    #[serde(default)]
    pub maintenance_window_dow: Option<String>,
    /// Time of day for installing updates, `HH:MM:SS`
    #[serde(default)]
    pub maintenance_window_time: Option<String>,
    /// Prevent the service from being deleted
    #[serde(default)]
    pub termination_protection: Option<bool>,
    /// Integrations requested at creation time only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_integrations: Vec<ServiceIntegrationItem>,
    #[serde(default)]
    pub auth_secret_ref: Option<AuthSecretReference>,
    #[serde(default)]
    pub conn_info_secret_target: Option<ConnInfoSecretTarget>,
}

/// Integration created together with the service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceIntegrationItem {
    /// Only `read_replica` is meaningful at creation time
    pub integration_type: String,
    pub source_service_name: String,
}

/// Free-form user configuration forwarded to Aiven
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UserConfig(pub Map<String, Value>);

impl UserConfig {
    /// JSON object for the API, with `null` leaves removed
    #[must_use]
    pub fn to_api(&self) -> Map<String, Value> {
        self.0
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), strip_nulls(v)))
            .collect()
    }
}

fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_nulls).collect()),
        other => other.clone(),
    }
}

impl JsonSchema for UserConfig {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("UserConfig")
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        // Structural schema: arbitrary nested object, kept verbatim by the API server
        schemars::json_schema!({
            "type": "object",
            "x-kubernetes-preserve-unknown-fields": true,
            "description": "Service or integration specific settings, forwarded to Aiven"
        })
    }
}

/// Convert a disk space quantity (`80GiB`, `100Gi`, `1TiB`, `512MiB`) into MiB
///
/// Plain numbers are taken as MiB. Returns `None` for unparsable input.
#[must_use]
pub fn disk_space_to_mib(quantity: &str) -> Option<u64> {
    let trimmed = quantity.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let number: u64 = number.parse().ok()?;
    let factor = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "mi" | "mib" => 1,
        "gi" | "gib" => 1_024,
        "ti" | "tib" => 1_024 * 1_024,
        _ => return None,
    };
    number.checked_mul(factor)
}
