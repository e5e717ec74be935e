//! # Handlers
//!
//! One [`Handler`] per resource kind translates the generic lifecycle calls of the
//! reconciler into Aiven API operations:
//!
//! - [`database::DatabaseHandler`], [`kafka_acl::KafkaAclHandler`],
//!   [`service_integration::ServiceIntegrationHandler`], [`project_vpc::ProjectVpcHandler`]
//! - [`service::ServiceHandler`], generic over a [`service::ServiceAdapter`], for every
//!   managed-service kind
//!
//! Handlers set conditions and the processed-generation marker on the resource they
//! are given; persisting them is the reconciler's job.

pub mod database;
pub mod kafka_acl;
pub mod project_vpc;
pub mod service;
pub mod service_integration;

pub use database::DatabaseHandler;
pub use kafka_acl::KafkaAclHandler;
pub use project_vpc::ProjectVpcHandler;
pub use service::{ServiceAdapter, ServiceHandler};
pub use service_integration::ServiceIntegrationHandler;

use crate::constants::SERVICE_STATE_RUNNING;
use crate::controller::store::ResourceKey;
use crate::crd::ManagedResource;
use crate::provider::{AivenError, AivenResult, ControlPlane};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ApiResource, DynamicObject};
use thiserror::Error;

/// Errors returned by handlers
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The object handed to the handler is of another kind
    #[error("cannot convert object of kind {found} to {expected}")]
    TypeMismatch { expected: String, found: String },

    /// The object has the right kind but does not decode
    #[error("failed to decode {kind} object: {source}")]
    Decode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// Remote deletion refused while the termination-protection flag is set
    #[error("termination protection is on, refusing to delete the remote resource")]
    TerminationProtected,

    /// Spec values that cannot be turned into a request
    #[error("invalid resource: {0}")]
    Invalid(String),

    #[error(transparent)]
    Remote(#[from] AivenError),
}

impl HandlerError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Remote(e) if e.is_not_found())
    }
}

/// A resource another resource depends on
#[derive(Debug, Clone)]
pub struct ObjectReference {
    pub api_resource: ApiResource,
    pub key: ResourceKey,
}

impl ObjectReference {
    #[must_use]
    pub fn to<K: ManagedResource>(key: ResourceKey) -> Self {
        Self {
            api_resource: ApiResource::erase::<K>(&()),
            key,
        }
    }
}

/// Lifecycle capability set of one resource kind
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    type Kind: ManagedResource;

    /// Decode a generic object into this handler's kind
    ///
    /// # Errors
    ///
    /// [`HandlerError::TypeMismatch`] when the object is of another kind.
    fn convert(&self, object: &DynamicObject) -> Result<Self::Kind, HandlerError> {
        convert_object(object)
    }

    /// Resources that must exist and run before this one is created
    fn references(&self, _resource: &Self::Kind) -> Vec<ObjectReference> {
        Vec::new()
    }

    /// Read-only check of remote prerequisites; `Ok(false)` means "try later"
    async fn check_preconditions(
        &self,
        avn: &dyn ControlPlane,
        resource: &Self::Kind,
    ) -> Result<bool, HandlerError>;

    /// Create the remote resource, or update it when it exists
    ///
    /// On success sets Initialized/Running and the processed-generation marker.
    async fn create_or_update(
        &self,
        avn: &dyn ControlPlane,
        resource: &mut Self::Kind,
        references: &[DynamicObject],
    ) -> Result<(), HandlerError>;

    /// Poll the remote resource; returns connection credentials once it runs
    async fn get(
        &self,
        avn: &dyn ControlPlane,
        resource: &mut Self::Kind,
    ) -> Result<Option<Secret>, HandlerError>;

    /// Delete the remote resource; `Ok(true)` once it is gone
    async fn delete(&self, avn: &dyn ControlPlane, resource: &Self::Kind) -> Result<bool, HandlerError>;
}

/// Decode `object` as `K` after checking its `apiVersion` and `kind`
///
/// # Errors
///
/// [`HandlerError::TypeMismatch`] for another kind, [`HandlerError::Decode`] for a
/// malformed object.
pub fn convert_object<K: ManagedResource>(object: &DynamicObject) -> Result<K, HandlerError> {
    let kind = K::kind(&());
    let api_version = K::api_version(&());
    match &object.types {
        Some(types) if types.kind == kind && types.api_version == api_version => {}
        Some(types) => {
            return Err(HandlerError::TypeMismatch {
                expected: format!("{api_version}/{kind}"),
                found: format!("{}/{}", types.api_version, types.kind),
            });
        }
        None => {
            return Err(HandlerError::TypeMismatch {
                expected: format!("{api_version}/{kind}"),
                found: "untyped object".to_string(),
            });
        }
    }
    serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .map_err(|source| HandlerError::Decode {
            kind: kind.to_string(),
            source,
        })
}

/// Whether a service exists and is `RUNNING`; a missing service is simply not running
///
/// # Errors
///
/// Any remote error other than not-found.
pub async fn check_service_is_running(
    avn: &dyn ControlPlane,
    project: &str,
    service: &str,
) -> Result<bool, HandlerError> {
    match avn.get_service(project, service).await {
        Ok(info) => Ok(info.state == SERVICE_STATE_RUNNING),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Map a remote delete result: not-found means already gone
pub(crate) fn deleted(result: AivenResult<()>) -> Result<bool, HandlerError> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => Ok(true),
        Err(e) => Err(e.into()),
    }
}

/// Map a remote lookup result: not-found means absent
pub(crate) fn found<T>(result: AivenResult<T>) -> Result<Option<T>, HandlerError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}
