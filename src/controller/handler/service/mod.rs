//! # Managed Services
//!
//! One handler serves every Aiven service kind. What differs between kinds (service
//! type, disk and user config, the shape of the connection secret) comes from the
//! kind's [`ServiceAdapter`] implementation.

mod adapters;

use super::project_vpc::find_project_vpc;
use super::{check_service_is_running, deleted, found, Handler, HandlerError, ObjectReference};
use crate::constants::{READ_REPLICA_INTEGRATION, SERVICE_STATE_RUNNING};
use crate::controller::reconciler::status;
use crate::controller::store::ResourceKey;
use crate::crd::{
    disk_space_to_mib, ConditionReason, ManagedResource, ProjectVpc, ServiceCommonSpec, UserConfig,
};
use crate::provider::types::{
    CreateServiceRequest, MaintenanceWindow, NewServiceIntegration, ServiceInfo, UpdateServiceRequest,
};
use crate::provider::ControlPlane;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

/// Per-kind knowledge the generic service handler needs
pub trait ServiceAdapter: ManagedResource {
    /// Aiven service type, e.g. `pg`
    const SERVICE_TYPE: &'static str;

    fn common_spec(&self) -> &ServiceCommonSpec;

    fn disk_space(&self) -> Option<&str>;

    fn user_config(&self) -> Option<&UserConfig>;

    /// User config keys Aiven accepts only when the service is created
    const CREATE_ONLY_USER_CONFIG_KEYS: &'static [&'static str] = &["project_to_fork_from", "service_to_fork_from"];

    /// Connection secret for a running service
    fn new_secret(&self, service: &ServiceInfo) -> Secret;
}

/// Secret named after `connInfoSecretTarget` (or the resource), keys prefixed as configured
///
/// Entries without a value are left out.
pub fn connection_secret<K: ManagedResource>(
    resource: &K,
    entries: impl IntoIterator<Item = (&'static str, Option<String>)>,
) -> Secret {
    let target = resource.conn_info_secret_target();
    let name = target
        .map(|t| t.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| resource.name_any());
    let prefix = target.and_then(|t| t.prefix.as_deref()).unwrap_or_default();

    let string_data: BTreeMap<String, String> = entries
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (format!("{prefix}{key}"), v)))
        .collect();

    Secret {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: resource.namespace(),
            ..ObjectMeta::default()
        },
        string_data: Some(string_data),
        ..Secret::default()
    }
}

/// Handler for every [`ServiceAdapter`] kind
pub struct ServiceHandler<K> {
    kind: PhantomData<fn() -> K>,
}

impl<K> ServiceHandler<K> {
    #[must_use]
    pub fn new() -> Self {
        Self { kind: PhantomData }
    }
}

impl<K> Default for ServiceHandler<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ServiceAdapter> fmt::Debug for ServiceHandler<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandler")
            .field("service_type", &K::SERVICE_TYPE)
            .finish()
    }
}

/// Fields shared by create and update requests
struct ServiceSettings {
    plan: String,
    cloud: Option<String>,
    disk_space_mb: Option<u64>,
    maintenance: Option<MaintenanceWindow>,
    project_vpc_id: Option<String>,
    termination_protection: bool,
    user_config: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ServiceSettings {
    fn from_resource<K: ServiceAdapter>(resource: &K, references: &[DynamicObject]) -> Result<Self, HandlerError> {
        let spec = resource.common_spec();
        let disk_space_mb = resource
            .disk_space()
            .filter(|d| !d.is_empty())
            .map(|d| disk_space_to_mib(d).ok_or_else(|| HandlerError::Invalid(format!("invalid disk space {d:?}"))))
            .transpose()?;
        let maintenance = match (&spec.maintenance_window_dow, &spec.maintenance_window_time) {
            (Some(dow), Some(time)) => Some(MaintenanceWindow {
                dow: dow.clone(),
                time: time.clone(),
            }),
            _ => None,
        };
        Ok(Self {
            plan: spec.plan.clone(),
            cloud: spec.cloud_name.clone(),
            disk_space_mb,
            maintenance,
            project_vpc_id: resolve_project_vpc_id(spec, references),
            termination_protection: resource.termination_protection(),
            user_config: resource.user_config().map(UserConfig::to_api),
        })
    }
}

/// Explicit VPC id, or the id recorded by a referenced ProjectVPC
fn resolve_project_vpc_id(spec: &ServiceCommonSpec, references: &[DynamicObject]) -> Option<String> {
    spec.project_vpc_id
        .clone()
        .filter(|id| !id.is_empty())
        .or_else(|| find_project_vpc(references).and_then(|vpc| vpc.remote_id().map(str::to_string)))
}

#[async_trait]
impl<K: ServiceAdapter> Handler for ServiceHandler<K> {
    type Kind = K;

    fn references(&self, resource: &K) -> Vec<ObjectReference> {
        let namespace = resource.namespace().unwrap_or_else(|| "default".to_string());
        resource
            .common_spec()
            .project_vpc_ref
            .iter()
            .map(|r| {
                let ns = r.namespace.clone().unwrap_or_else(|| namespace.clone());
                ObjectReference::to::<ProjectVpc>(ResourceKey::new(ns, &r.name))
            })
            .collect()
    }

    /// Read replicas wait for their primary
    async fn check_preconditions(&self, avn: &dyn ControlPlane, resource: &K) -> Result<bool, HandlerError> {
        let spec = resource.common_spec();
        for integration in &spec.service_integrations {
            if integration.integration_type == READ_REPLICA_INTEGRATION
                && !check_service_is_running(avn, &spec.project, &integration.source_service_name).await?
            {
                debug!(
                    "read replica source {}/{} is not running yet",
                    spec.project, integration.source_service_name
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn create_or_update(
        &self,
        avn: &dyn ControlPlane,
        resource: &mut K,
        references: &[DynamicObject],
    ) -> Result<(), HandlerError> {
        let name = resource.name_any();
        let project = resource.common_spec().project.clone();
        let settings = ServiceSettings::from_resource(resource, references)?;

        let reason = if found(avn.get_service(&project, &name).await)?.is_some() {
            let user_config = settings.user_config.map(|mut config| {
                for key in K::CREATE_ONLY_USER_CONFIG_KEYS {
                    config.remove(*key);
                }
                config
            });
            let request = UpdateServiceRequest {
                powered: true,
                plan: settings.plan,
                cloud: settings.cloud,
                disk_space_mb: settings.disk_space_mb,
                maintenance: settings.maintenance,
                project_vpc_id: settings.project_vpc_id,
                termination_protection: settings.termination_protection,
                user_config,
            };
            avn.update_service(&project, &name, &request).await?;
            ConditionReason::Updated
        } else {
            let request = CreateServiceRequest {
                service_name: name.clone(),
                service_type: K::SERVICE_TYPE.to_string(),
                plan: settings.plan,
                cloud: settings.cloud,
                disk_space_mb: settings.disk_space_mb,
                maintenance: settings.maintenance,
                project_vpc_id: settings.project_vpc_id,
                service_integrations: resource
                    .common_spec()
                    .service_integrations
                    .iter()
                    .map(|i| NewServiceIntegration {
                        integration_type: i.integration_type.clone(),
                        source_service: i.source_service_name.clone(),
                        source_project: None,
                    })
                    .collect(),
                termination_protection: settings.termination_protection,
                user_config: settings.user_config,
            };
            match avn.create_service(&project, &request).await {
                Ok(_) => {}
                Err(e) if e.is_already_exists() => {
                    debug!("service {project}/{name} appeared concurrently, adopting it");
                }
                Err(e) => return Err(e.into()),
            }
            ConditionReason::Created
        };

        status::mark_created_or_updated(resource, reason);
        Ok(())
    }

    async fn get(&self, avn: &dyn ControlPlane, resource: &mut K) -> Result<Option<Secret>, HandlerError> {
        let project = resource.common_spec().project.clone();
        let service = avn.get_service(&project, &resource.name_any()).await?;
        resource.status_or_default().state = Some(service.state.clone());

        if service.state == SERVICE_STATE_RUNNING {
            status::mark_running(resource);
            Ok(Some(resource.new_secret(&service)))
        } else {
            status::mark_not_running(resource, &service.state);
            Ok(None)
        }
    }

    async fn delete(&self, avn: &dyn ControlPlane, resource: &K) -> Result<bool, HandlerError> {
        if resource.termination_protection() {
            return Err(HandlerError::TerminationProtected);
        }
        deleted(
            avn.delete_service(&resource.common_spec().project, &resource.name_any())
                .await,
        )
    }
}
