//! In-memory [`ObjectStore`] with API-server semantics for versions, finalizers
//! and deletion.

use super::{MetadataPatch, ObjectStore, ResourceKey, StoreError};
use crate::crd::ManagedResource;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ApiResource, DynamicObject};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<(String, ResourceKey), DynamicObject>,
    secrets: BTreeMap<ResourceKey, Secret>,
    next_version: u64,
    pending_conflicts: u32,
    secret_applies: usize,
}

impl State {
    fn bump(&mut self, object: &mut DynamicObject) {
        self.next_version += 1;
        object.metadata.resource_version = Some(self.next_version.to_string());
    }

    /// Stored object ready for a write at `resource_version`
    fn writable(
        &mut self,
        slot: &(String, ResourceKey),
        resource_version: &str,
    ) -> Result<DynamicObject, StoreError> {
        let mut object = self
            .objects
            .get(slot)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(slot.1.to_string()))?;
        if self.pending_conflicts > 0 {
            // Another writer got there first
            self.pending_conflicts -= 1;
            self.bump(&mut object);
            self.objects.insert(slot.clone(), object);
            return Err(StoreError::Conflict(slot.1.to_string()));
        }
        if object.metadata.resource_version.as_deref() != Some(resource_version) {
            return Err(StoreError::Conflict(slot.1.to_string()));
        }
        Ok(object)
    }
}

fn type_key(resource: &ApiResource) -> String {
    format!("{}/{}", resource.api_version, resource.kind)
}

fn to_dynamic<K: ManagedResource>(resource: &K) -> Result<DynamicObject, StoreError> {
    Ok(serde_json::from_value(serde_json::to_value(resource)?)?)
}

fn from_dynamic<K: ManagedResource>(object: &DynamicObject) -> Option<K> {
    serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .ok()
}

/// Object store kept in process
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot<K: ManagedResource>(key: &ResourceKey) -> (String, ResourceKey) {
        (type_key(&ApiResource::erase::<K>(&())), key.clone())
    }

    /// Store a new resource at generation 1 (unless it carries one)
    ///
    /// # Errors
    ///
    /// Returns an error when the resource does not serialize.
    pub fn insert<K: ManagedResource>(&self, resource: &K) -> Result<ResourceKey, StoreError> {
        let mut object = to_dynamic(resource)?;
        object.metadata.generation.get_or_insert(1);
        let key = ResourceKey::from_resource(resource);
        object.metadata.namespace = Some(key.namespace.clone());

        let mut state = self.lock();
        state.bump(&mut object);
        state.objects.insert(Self::slot::<K>(&key), object);
        Ok(key)
    }

    /// Typed copy of a stored resource
    #[must_use]
    pub fn get_typed<K: ManagedResource>(&self, key: &ResourceKey) -> Option<K> {
        self.lock()
            .objects
            .get(&Self::slot::<K>(key))
            .and_then(from_dynamic)
    }

    #[must_use]
    pub fn contains<K: ManagedResource>(&self, key: &ResourceKey) -> bool {
        self.lock().objects.contains_key(&Self::slot::<K>(key))
    }

    /// Apply a user edit to the spec; bumps the generation
    ///
    /// Returns `false` when the resource does not exist.
    pub fn update_spec<K: ManagedResource>(&self, key: &ResourceKey, edit: impl FnOnce(&mut K)) -> bool {
        let slot = Self::slot::<K>(key);
        let mut state = self.lock();
        let Some(mut resource) = state.objects.get(&slot).and_then(from_dynamic::<K>) else {
            return false;
        };
        edit(&mut resource);
        let Ok(mut object) = to_dynamic(&resource) else {
            return false;
        };
        object.metadata.generation = Some(object.metadata.generation.unwrap_or(0) + 1);
        state.bump(&mut object);
        state.objects.insert(slot, object);
        true
    }

    /// Mark a resource for deletion; it disappears once no finalizer is left
    pub fn request_deletion<K: ManagedResource>(&self, key: &ResourceKey) {
        let slot = Self::slot::<K>(key);
        let mut state = self.lock();
        let Some(object) = state.objects.get(&slot).cloned() else {
            return;
        };
        if object.metadata.finalizers.as_ref().is_none_or(Vec::is_empty) {
            state.objects.remove(&slot);
            return;
        }
        let Ok(mut value) = serde_json::to_value(&object) else {
            return;
        };
        value["metadata"]["deletionTimestamp"] =
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
        if let Ok(mut updated) = serde_json::from_value::<DynamicObject>(value) {
            state.bump(&mut updated);
            state.objects.insert(slot, updated);
        }
    }

    /// Make the next `count` writes fail as if another writer raced this one
    pub fn inject_conflicts(&self, count: u32) {
        self.lock().pending_conflicts = count;
    }

    pub fn insert_secret(&self, secret: Secret) {
        let key = ResourceKey::new(
            secret.metadata.namespace.clone().unwrap_or_default(),
            secret.metadata.name.clone().unwrap_or_default(),
        );
        self.lock().secrets.insert(key, secret);
    }

    #[must_use]
    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.lock()
            .secrets
            .get(&ResourceKey::new(namespace, name))
            .cloned()
    }

    /// Number of secret upserts so far
    #[must_use]
    pub fn secret_applies(&self) -> usize {
        self.lock().secret_applies
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, resource: &ApiResource, key: &ResourceKey) -> Result<Option<DynamicObject>, StoreError> {
        Ok(self
            .lock()
            .objects
            .get(&(type_key(resource), key.clone()))
            .cloned())
    }

    async fn patch_metadata(
        &self,
        resource: &ApiResource,
        key: &ResourceKey,
        patch: &MetadataPatch,
    ) -> Result<DynamicObject, StoreError> {
        let slot = (type_key(resource), key.clone());
        let mut state = self.lock();
        let mut object = state.writable(&slot, &patch.resource_version)?;

        let annotations = object.metadata.annotations.get_or_insert_with(BTreeMap::new);
        for (name, value) in &patch.annotations {
            match value {
                Some(value) => annotations.insert(name.clone(), value.clone()),
                None => annotations.remove(name),
            };
        }
        object.metadata.finalizers = Some(patch.finalizers.clone());
        state.bump(&mut object);

        if object.metadata.deletion_timestamp.is_some() && patch.finalizers.is_empty() {
            state.objects.remove(&slot);
        } else {
            state.objects.insert(slot, object.clone());
        }
        Ok(object)
    }

    async fn patch_status(
        &self,
        resource: &ApiResource,
        key: &ResourceKey,
        resource_version: &str,
        status: &Value,
    ) -> Result<DynamicObject, StoreError> {
        let slot = (type_key(resource), key.clone());
        let mut state = self.lock();
        let mut object = state.writable(&slot, resource_version)?;
        if let Value::Object(data) = &mut object.data {
            data.insert("status".to_string(), status.clone());
        }
        state.bump(&mut object);
        state.objects.insert(slot, object.clone());
        Ok(object)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        Ok(self.secret(namespace, name))
    }

    async fn apply_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.secret_applies += 1;
        let key = ResourceKey::new(
            secret.metadata.namespace.clone().unwrap_or_default(),
            secret.metadata.name.clone().unwrap_or_default(),
        );
        state.secrets.insert(key, secret.clone());
        Ok(())
    }
}
