//! # Connection Secrets
//!
//! Secrets produced by `get` are finished here and upserted: owned by the resource
//! so they are garbage-collected with it, labelled as managed by the operator, and
//! stripped of empty values.

use crate::constants::{FIELD_MANAGER, MANAGED_BY_LABEL};
use crate::controller::store::{ObjectStore, StoreError};
use crate::crd::ManagedResource;
use crate::observability::metrics;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use tracing::{debug, info};

/// Owner reference, labels and namespace of the owning resource; empty values dropped
#[must_use]
pub fn finish_secret<K: ManagedResource>(resource: &K, mut secret: Secret) -> Secret {
    if secret.metadata.namespace.is_none() {
        secret.metadata.namespace = resource.namespace();
    }
    if let Some(owner) = resource.controller_owner_ref(&()) {
        secret.metadata.owner_references = Some(vec![owner]);
    }
    secret
        .metadata
        .labels
        .get_or_insert_with(Default::default)
        .insert(MANAGED_BY_LABEL.to_string(), FIELD_MANAGER.to_string());

    if let Some(string_data) = secret.string_data.as_mut() {
        string_data.retain(|_, value| !value.is_empty());
    }
    if let Some(data) = secret.data.as_mut() {
        data.retain(|_, value| !value.0.is_empty());
    }
    secret
}

/// Upsert the connection secret of `resource`
///
/// # Errors
///
/// Returns the store error when the write fails.
pub async fn apply_connection_secret<K: ManagedResource>(
    store: &dyn ObjectStore,
    resource: &K,
    secret: Secret,
) -> Result<(), StoreError> {
    let secret = finish_secret(resource, secret);
    let name = secret.metadata.name.clone().unwrap_or_default();
    debug!(secret = %name, "Applying connection secret");
    store.apply_secret(&secret).await?;
    metrics::increment_secrets_applied(&K::kind(&()));
    info!(
        "🔑 Connection secret {}/{} written",
        secret.metadata.namespace.as_deref().unwrap_or("default"),
        name
    );
    Ok(())
}
