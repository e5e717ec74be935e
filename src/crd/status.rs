//! # Resource Status
//!
//! Observed state shared by every Aiven resource kind, plus the spec fragments
//! that all kinds reuse (auth and secret targets, references).

use super::condition::Condition;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of an Aiven resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Remote state as reported by Aiven (e.g. `RUNNING`, `REBUILDING`, `ACTIVE`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Remote identifier needed to address the resource in later calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Set once a poll has confirmed the remote resource running
    /// Written only by the operator
    #[serde(default)]
    pub instance_running: bool,
}

/// Reference to the secret holding the Aiven API token
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthSecretReference {
    /// Secret name in the resource namespace
    pub name: String,
    /// Key inside the secret
    pub key: String,
}

/// Where connection credentials are written once the resource is running
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnInfoSecretTarget {
    /// Secret name
    pub name: String,
    /// Prefix prepended to every key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Reference to another resource of a known kind
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    pub name: String,
    /// Defaults to the namespace of the referencing resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}
