//! # Object Store
//!
//! The operator's view of the Kubernetes API: reading resources as
//! [`DynamicObject`]s and writing annotations, finalizers and status under
//! optimistic concurrency.
//!
//! Every write carries the `resourceVersion` the pass read. A stale version fails
//! with [`StoreError::Conflict`] and the pass starts over from a fresh read.

mod kube_store;
mod memory;

pub use kube_store::KubeStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ApiResource, DynamicObject};
use kube::{Resource, ResourceExt};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Namespace-qualified name of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a namespaced object; objects without namespace map to `default`
    #[must_use]
    pub fn from_resource<K: Resource>(resource: &K) -> Self {
        Self::new(
            resource.namespace().unwrap_or_else(|| "default".to_string()),
            resource.name_any(),
        )
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Errors of the object store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object changed since it was read
    #[error("object {0} was modified concurrently")]
    Conflict(String),

    #[error("object {0} not found")]
    NotFound(String),

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("failed to serialize object: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Classify a kube error for the object at `key`
    pub(crate) fn from_kube(error: kube::Error, key: &ResourceKey) -> Self {
        match error {
            kube::Error::Api(ae) if ae.code == 409 => Self::Conflict(key.to_string()),
            kube::Error::Api(ae) if ae.code == 404 => Self::NotFound(key.to_string()),
            other => Self::Kube(other),
        }
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Changes to annotations and finalizers of one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPatch {
    /// Version the change was computed from
    pub resource_version: String,
    /// `Some` sets an annotation, `None` removes it
    pub annotations: BTreeMap<String, Option<String>>,
    /// Full finalizer list after the change
    pub finalizers: Vec<String>,
}

impl MetadataPatch {
    /// JSON merge patch body
    #[must_use]
    pub fn to_merge_patch(&self) -> Value {
        let annotations: Map<String, Value> = self
            .annotations
            .iter()
            .map(|(k, v)| (k.clone(), v.clone().map_or(Value::Null, Value::String)))
            .collect();
        json!({
            "metadata": {
                "resourceVersion": self.resource_version,
                "annotations": annotations,
                "finalizers": self.finalizers,
            }
        })
    }
}

/// Status merge patch body guarded by `resource_version`
#[must_use]
pub fn status_merge_patch(resource_version: &str, status: &Value) -> Value {
    json!({
        "metadata": { "resourceVersion": resource_version },
        "status": status,
    })
}

/// Read and write access to resources and secrets
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Current object, `None` once it is gone
    async fn get(&self, resource: &ApiResource, key: &ResourceKey) -> Result<Option<DynamicObject>, StoreError>;

    /// Write annotations and finalizers; returns the stored object
    async fn patch_metadata(
        &self,
        resource: &ApiResource,
        key: &ResourceKey,
        patch: &MetadataPatch,
    ) -> Result<DynamicObject, StoreError>;

    /// Write the status sub-document; returns the stored object
    async fn patch_status(
        &self,
        resource: &ApiResource,
        key: &ResourceKey,
        resource_version: &str,
        status: &Value,
    ) -> Result<DynamicObject, StoreError>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError>;

    /// Create or replace a secret
    async fn apply_secret(&self, secret: &Secret) -> Result<(), StoreError>;
}
