//! Integrations between services or external endpoints.

use super::{check_service_is_running, deleted, found, Handler, HandlerError};
use crate::controller::reconciler::status;
use crate::crd::{ConditionReason, ManagedResource, ServiceIntegration};
use crate::provider::types::{CreateServiceIntegrationRequest, UpdateServiceIntegrationRequest};
use crate::provider::{AivenError, ControlPlane};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::DynamicObject;
use tracing::debug;

/// Handler for [`ServiceIntegration`]
#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceIntegrationHandler;

fn request_for(integration: &ServiceIntegration) -> CreateServiceIntegrationRequest {
    let spec = &integration.spec;
    CreateServiceIntegrationRequest {
        integration_type: spec.integration_type.clone(),
        source_project: spec
            .source_service_name
            .as_ref()
            .map(|_| spec.source_project().to_string()),
        source_service: spec.source_service_name.clone(),
        dest_project: spec
            .destination_service_name
            .as_ref()
            .map(|_| spec.destination_project().to_string()),
        dest_service: spec.destination_service_name.clone(),
        source_endpoint_id: spec.source_endpoint_id.clone(),
        dest_endpoint_id: spec.destination_endpoint_id.clone(),
        user_config: spec.user_config.as_ref().map(|c| c.to_api()),
    }
}

/// Aiven rejects an update that changes nothing; that is a successful update here
fn is_user_config_not_changed(error: &AivenError) -> bool {
    matches!(error, AivenError::Api { message, .. } if message.contains("user config not changed"))
}

/// Id of an integration already connecting the same ends, if any
async fn find_existing(
    avn: &dyn ControlPlane,
    integration: &ServiceIntegration,
    request: &CreateServiceIntegrationRequest,
) -> Result<Option<String>, HandlerError> {
    let project = &integration.spec.project;
    if let Some(id) = integration.remote_id() {
        if found(avn.get_service_integration(project, id).await)?.is_some() {
            return Ok(Some(id.to_string()));
        }
    }
    // Integrations between two endpoints belong to no service
    let listing = match request.source_service.as_ref().or(request.dest_service.as_ref()) {
        Some(service) => avn.list_service_integrations(project, service).await,
        None => avn.list_project_integrations(project).await,
    };
    let listed = match listing {
        Ok(listed) => listed,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(listed
        .into_iter()
        .find(|existing| request.matches(existing))
        .map(|existing| existing.service_integration_id))
}

#[async_trait]
impl Handler for ServiceIntegrationHandler {
    type Kind = ServiceIntegration;

    async fn check_preconditions(
        &self,
        avn: &dyn ControlPlane,
        integration: &ServiceIntegration,
    ) -> Result<bool, HandlerError> {
        let spec = &integration.spec;
        if let Some(source) = &spec.source_service_name {
            if !check_service_is_running(avn, spec.source_project(), source).await? {
                return Ok(false);
            }
        }
        if let Some(destination) = &spec.destination_service_name {
            if !check_service_is_running(avn, spec.destination_project(), destination).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn create_or_update(
        &self,
        avn: &dyn ControlPlane,
        integration: &mut ServiceIntegration,
        _references: &[DynamicObject],
    ) -> Result<(), HandlerError> {
        let request = request_for(integration);
        let project = integration.spec.project.clone();

        let (id, reason) = match find_existing(avn, integration, &request).await? {
            Some(id) => {
                if let Some(user_config) = request.user_config.clone().filter(|c| !c.is_empty()) {
                    let update = UpdateServiceIntegrationRequest { user_config };
                    match avn.update_service_integration(&project, &id, &update).await {
                        Ok(_) => {}
                        Err(e) if is_user_config_not_changed(&e) => {
                            debug!("integration {project}/{id} user config unchanged");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                (id, ConditionReason::Updated)
            }
            None => {
                let created = avn.create_service_integration(&project, &request).await?;
                (created.service_integration_id, ConditionReason::Created)
            }
        };

        integration.status_or_default().id = Some(id);
        status::mark_created_or_updated(integration, reason);
        Ok(())
    }

    async fn get(
        &self,
        avn: &dyn ControlPlane,
        integration: &mut ServiceIntegration,
    ) -> Result<Option<Secret>, HandlerError> {
        let id = integration
            .remote_id()
            .ok_or_else(|| AivenError::NotFound("integration has no recorded id".to_string()))?
            .to_string();
        let info = avn
            .get_service_integration(&integration.spec.project, &id)
            .await?;
        if info.active {
            status::mark_running(integration);
        } else {
            status::mark_not_running(integration, "INACTIVE");
        }
        Ok(None)
    }

    async fn delete(&self, avn: &dyn ControlPlane, integration: &ServiceIntegration) -> Result<bool, HandlerError> {
        let request = request_for(integration);
        match find_existing(avn, integration, &request).await? {
            Some(id) => deleted(
                avn.delete_service_integration(&integration.spec.project, &id)
                    .await,
            ),
            None => Ok(true),
        }
    }
}
