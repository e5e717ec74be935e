//! Resolution of the resources a resource depends on.
//!
//! A reference is usable once it exists and a poll has confirmed it running
//! (`status.instanceRunning`). Anything less keeps the dependent resource waiting.

use crate::controller::handler::ObjectReference;
use crate::controller::store::{ObjectStore, StoreError};
use kube::api::DynamicObject;
use serde_json::Value;
use tracing::debug;

fn is_running(object: &DynamicObject) -> bool {
    object
        .data
        .get("status")
        .and_then(|status| status.get("instanceRunning"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Load every reference; `None` when one is missing or not running yet
///
/// # Errors
///
/// Returns the store error when a read fails.
pub async fn resolve(
    store: &dyn ObjectStore,
    references: &[ObjectReference],
) -> Result<Option<Vec<DynamicObject>>, StoreError> {
    let mut resolved = Vec::with_capacity(references.len());
    for reference in references {
        match store.get(&reference.api_resource, &reference.key).await? {
            Some(object) if is_running(&object) => resolved.push(object),
            Some(_) => {
                debug!(
                    "{} {} is not running yet",
                    reference.api_resource.kind, reference.key
                );
                return Ok(None);
            }
            None => {
                debug!("{} {} does not exist yet", reference.api_resource.kind, reference.key);
                return Ok(None);
            }
        }
    }
    Ok(Some(resolved))
}
