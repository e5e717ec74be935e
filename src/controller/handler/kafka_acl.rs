//! Topic ACL entries of a Kafka service.
//!
//! ACL entries are immutable on Aiven. A spec change creates the new entry first and
//! then drops the one recorded in `status.id`.

use super::{check_service_is_running, deleted, found, Handler, HandlerError};
use crate::controller::reconciler::status;
use crate::crd::{ConditionReason, KafkaAcl, ManagedResource};
use crate::provider::types::{CreateKafkaAclRequest, KafkaAclInfo};
use crate::provider::{AivenError, ControlPlane};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::DynamicObject;
use tracing::{debug, info};

/// Handler for [`KafkaAcl`]
#[derive(Debug, Default, Clone, Copy)]
pub struct KafkaAclHandler;

fn request_for(acl: &KafkaAcl) -> CreateKafkaAclRequest {
    CreateKafkaAclRequest {
        permission: acl.spec.permission.as_str().to_string(),
        topic: acl.spec.topic.clone(),
        username: acl.spec.username.clone(),
    }
}

/// Existing entry granting exactly `request`, looked up by recorded id first
async fn find_matching(
    avn: &dyn ControlPlane,
    acl: &KafkaAcl,
    request: &CreateKafkaAclRequest,
) -> Result<Option<KafkaAclInfo>, HandlerError> {
    let (project, service) = (&acl.spec.project, &acl.spec.service_name);
    if let Some(id) = acl.remote_id() {
        if let Some(existing) = found(avn.get_kafka_acl(project, service, id).await)? {
            if request.matches(&existing) {
                return Ok(Some(existing));
            }
        }
    }
    Ok(avn
        .list_kafka_acls(project, service)
        .await?
        .into_iter()
        .find(|existing| request.matches(existing)))
}

#[async_trait]
impl Handler for KafkaAclHandler {
    type Kind = KafkaAcl;

    async fn check_preconditions(&self, avn: &dyn ControlPlane, acl: &KafkaAcl) -> Result<bool, HandlerError> {
        check_service_is_running(avn, &acl.spec.project, &acl.spec.service_name).await
    }

    async fn create_or_update(
        &self,
        avn: &dyn ControlPlane,
        acl: &mut KafkaAcl,
        _references: &[DynamicObject],
    ) -> Result<(), HandlerError> {
        let request = request_for(acl);
        let project = acl.spec.project.clone();
        let service = acl.spec.service_name.clone();
        let previous_id = acl.remote_id().map(str::to_string);

        let (entry, reason) = match find_matching(avn, acl, &request).await? {
            Some(existing) => (existing, ConditionReason::Updated),
            None => match avn.create_kafka_acl(&project, &service, &request).await {
                Ok(created) => (created, ConditionReason::Created),
                Err(e) if e.is_already_exists() => {
                    let existing = find_matching(avn, acl, &request).await?.ok_or(e)?;
                    (existing, ConditionReason::Created)
                }
                Err(e) => return Err(e.into()),
            },
        };

        if let Some(stale) = previous_id.filter(|id| id.as_str() != entry.id) {
            info!("replacing kafka acl {stale} with {} on {project}/{service}", entry.id);
            deleted(avn.delete_kafka_acl(&project, &service, &stale).await)?;
        }

        acl.status_or_default().id = Some(entry.id);
        status::mark_created_or_updated(acl, reason);
        Ok(())
    }

    async fn get(&self, avn: &dyn ControlPlane, acl: &mut KafkaAcl) -> Result<Option<Secret>, HandlerError> {
        let id = acl
            .remote_id()
            .ok_or_else(|| AivenError::NotFound("kafka acl has no recorded id".to_string()))?
            .to_string();
        avn.get_kafka_acl(&acl.spec.project, &acl.spec.service_name, &id)
            .await?;
        status::mark_running(acl);
        Ok(None)
    }

    async fn delete(&self, avn: &dyn ControlPlane, acl: &KafkaAcl) -> Result<bool, HandlerError> {
        let (project, service) = (&acl.spec.project, &acl.spec.service_name);
        let id = match acl.remote_id() {
            Some(id) => id.to_string(),
            None => {
                // The create may have landed without its id being recorded.
                let request = request_for(acl);
                let listed = match avn.list_kafka_acls(project, service).await {
                    Ok(listed) => listed,
                    Err(e) if e.is_not_found() => return Ok(true),
                    Err(e) => return Err(e.into()),
                };
                match listed.into_iter().find(|existing| request.matches(existing)) {
                    Some(existing) => existing.id,
                    None => {
                        debug!("no kafka acl to delete for {project}/{service}");
                        return Ok(true);
                    }
                }
            }
        };
        deleted(avn.delete_kafka_acl(project, service, &id).await)
    }
}
