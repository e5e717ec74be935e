//! # Deletion Protocol
//!
//! The deletion finalizer is added before anything is created remotely and only
//! removed once the handler reports the remote resource deleted. While termination
//! protection is on, the finalizer stays and the resource is reported as blocked.

use super::types::{Outcome, Phase, ReconcileError};
use super::{status, Reconciler};
use crate::constants::DELETION_FINALIZER;
use crate::controller::handler::{Handler, HandlerError};
use crate::controller::store::{MetadataPatch, ObjectStore, ResourceKey, StoreError};
use crate::crd::ManagedResource;
use crate::observability::metrics;
use kube::api::ApiResource;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[must_use]
pub fn has_finalizer<K: ManagedResource>(resource: &K) -> bool {
    resource.finalizers().iter().any(|f| f == DELETION_FINALIZER)
}

async fn write_finalizers<K: ManagedResource>(
    store: &dyn ObjectStore,
    api_resource: &ApiResource,
    key: &ResourceKey,
    resource: &mut K,
    finalizers: Vec<String>,
) -> Result<(), StoreError> {
    let patch = MetadataPatch {
        resource_version: resource.resource_version().unwrap_or_default(),
        annotations: BTreeMap::new(),
        finalizers,
    };
    let stored = store.patch_metadata(api_resource, key, &patch).await?;
    let meta = resource.meta_mut();
    meta.finalizers = Some(patch.finalizers);
    meta.resource_version = stored.metadata.resource_version;
    Ok(())
}

/// Add the deletion finalizer when missing; `resource` follows the stored version
///
/// # Errors
///
/// Returns the store error, `Conflict` when the resource changed since it was read.
pub async fn ensure_finalizer<K: ManagedResource>(
    store: &dyn ObjectStore,
    api_resource: &ApiResource,
    key: &ResourceKey,
    resource: &mut K,
) -> Result<(), StoreError> {
    if has_finalizer(resource) {
        return Ok(());
    }
    let mut finalizers = resource.finalizers().to_vec();
    finalizers.push(DELETION_FINALIZER.to_string());
    write_finalizers(store, api_resource, key, resource, finalizers).await?;
    debug!("Added finalizer {DELETION_FINALIZER}");
    Ok(())
}

/// Remove the deletion finalizer, allowing the object to go away
///
/// # Errors
///
/// Returns the store error, `Conflict` when the resource changed since it was read.
pub async fn release_finalizer<K: ManagedResource>(
    store: &dyn ObjectStore,
    api_resource: &ApiResource,
    key: &ResourceKey,
    resource: &mut K,
) -> Result<(), StoreError> {
    let finalizers: Vec<String> = resource
        .finalizers()
        .iter()
        .filter(|f| *f != DELETION_FINALIZER)
        .cloned()
        .collect();
    write_finalizers(store, api_resource, key, resource, finalizers).await
}

impl<H: Handler> Reconciler<H> {
    /// Deletion branch of a pass; the resource carries a deletion timestamp
    pub(super) async fn finalize(&self, key: &ResourceKey, mut resource: H::Kind) -> Result<Outcome, ReconcileError> {
        if !has_finalizer(&resource) {
            debug!("Deletion requested and no finalizer of ours left");
            return Ok(Outcome::done(Phase::Gone));
        }

        let observed = resource.clone();
        let avn = self
            .clients
            .client_for(&key.namespace, resource.auth_secret_ref())
            .await?;

        match self.handler.delete(avn.as_ref(), &resource).await {
            Ok(true) => {
                release_finalizer(self.store.as_ref(), &self.api_resource, key, &mut resource).await?;
                metrics::increment_remote_deletions(self.kind());
                info!("🗑️  Remote resource deleted, finalizer removed");
                Ok(Outcome::done(Phase::Gone))
            }
            Ok(false) => {
                debug!("Remote deletion still in progress");
                metrics::increment_requeues_total("deletion-pending");
                Ok(Outcome::requeue(Phase::DeletionPending, self.config.requeue_interval))
            }
            Err(HandlerError::TerminationProtected) => {
                warn!("⛔ Deletion blocked: termination protection is on");
                status::mark_deletion_blocked(&mut resource);
                self.persist(key, &observed, &mut resource).await?;
                Err(HandlerError::TerminationProtected.into())
            }
            Err(error) => Err(error.into()),
        }
    }
}
