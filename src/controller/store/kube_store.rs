//! [`ObjectStore`] backed by the Kubernetes API.

use super::{status_merge_patch, MetadataPatch, ObjectStore, ResourceKey, StoreError};
use crate::constants::FIELD_MANAGER;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ApiResource, DynamicObject, Patch, PatchParams};
use kube::Client;
use serde_json::Value;
use tracing::debug;

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, resource: &ApiResource, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, resource)
    }

    fn merge_params() -> PatchParams {
        PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PatchParams::default()
        }
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get(&self, resource: &ApiResource, key: &ResourceKey) -> Result<Option<DynamicObject>, StoreError> {
        self.api(resource, &key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|e| StoreError::from_kube(e, key))
    }

    async fn patch_metadata(
        &self,
        resource: &ApiResource,
        key: &ResourceKey,
        patch: &MetadataPatch,
    ) -> Result<DynamicObject, StoreError> {
        debug!(resource = %key, resource_version = %patch.resource_version, "Patching metadata");
        self.api(resource, &key.namespace)
            .patch(&key.name, &Self::merge_params(), &Patch::Merge(patch.to_merge_patch()))
            .await
            .map_err(|e| StoreError::from_kube(e, key))
    }

    async fn patch_status(
        &self,
        resource: &ApiResource,
        key: &ResourceKey,
        resource_version: &str,
        status: &Value,
    ) -> Result<DynamicObject, StoreError> {
        debug!(resource = %key, resource_version, "Patching status");
        self.api(resource, &key.namespace)
            .patch_status(
                &key.name,
                &Self::merge_params(),
                &Patch::Merge(status_merge_patch(resource_version, status)),
            )
            .await
            .map_err(|e| StoreError::from_kube(e, key))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| StoreError::from_kube(e, &ResourceKey::new(namespace, name)))
    }

    async fn apply_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let key = ResourceKey::new(
            secret.metadata.namespace.clone().unwrap_or_default(),
            secret.metadata.name.clone().unwrap_or_default(),
        );
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &key.namespace);
        api.patch(
            &key.name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(secret),
        )
        .await
        .map_err(|e| StoreError::from_kube(e, &key))?;
        Ok(())
    }
}
