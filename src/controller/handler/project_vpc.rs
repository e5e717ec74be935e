//! Project VPCs. A VPC is usable once Aiven reports it `ACTIVE`.
//!
//! A VPC has no name on Aiven. When `status.id` was never stored, a live VPC with
//! the same cloud and CIDR is taken as the one this resource created.

use super::{convert_object, deleted, found, Handler, HandlerError};
use crate::constants::{VPC_STATES_GONE, VPC_STATE_ACTIVE};
use crate::controller::reconciler::status;
use crate::crd::{ConditionReason, ManagedResource, ProjectVpc};
use crate::provider::types::{CreateProjectVpcRequest, ProjectVpcInfo};
use crate::provider::{AivenError, ControlPlane};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::DynamicObject;
use tracing::debug;

/// Handler for [`ProjectVpc`]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectVpcHandler;

/// First project VPC among resolved references
#[must_use]
pub fn find_project_vpc(references: &[DynamicObject]) -> Option<ProjectVpc> {
    references
        .iter()
        .find_map(|object| convert_object::<ProjectVpc>(object).ok())
}

fn request_for(vpc: &ProjectVpc) -> CreateProjectVpcRequest {
    CreateProjectVpcRequest {
        cloud_name: vpc.spec.cloud_name.clone(),
        network_cidr: vpc.spec.network_cidr.clone(),
    }
}

/// Remote VPC of this resource: by recorded id, else a live one with the same cloud and CIDR
async fn find_existing(avn: &dyn ControlPlane, vpc: &ProjectVpc) -> Result<Option<ProjectVpcInfo>, HandlerError> {
    let project = &vpc.spec.project;
    if let Some(id) = vpc.remote_id() {
        return found(avn.get_project_vpc(project, id).await);
    }
    let request = request_for(vpc);
    let existing = avn
        .list_project_vpcs(project)
        .await?
        .into_iter()
        .find(|info| {
            info.cloud_name == request.cloud_name
                && info.network_cidr == request.network_cidr
                && !VPC_STATES_GONE.contains(&info.state.as_str())
        });
    if let Some(info) = &existing {
        debug!("adopting project vpc {} in {project}", info.project_vpc_id);
    }
    Ok(existing)
}

#[async_trait]
impl Handler for ProjectVpcHandler {
    type Kind = ProjectVpc;

    async fn check_preconditions(&self, _avn: &dyn ControlPlane, _vpc: &ProjectVpc) -> Result<bool, HandlerError> {
        Ok(true)
    }

    async fn create_or_update(
        &self,
        avn: &dyn ControlPlane,
        vpc: &mut ProjectVpc,
        _references: &[DynamicObject],
    ) -> Result<(), HandlerError> {
        // Cloud and CIDR cannot change after creation.
        let (info, reason) = match find_existing(avn, vpc).await? {
            Some(info) => (info, ConditionReason::Updated),
            None => (
                avn.create_project_vpc(&vpc.spec.project, &request_for(vpc)).await?,
                ConditionReason::Created,
            ),
        };

        let observed = vpc.status_or_default();
        observed.id = Some(info.project_vpc_id);
        observed.state = Some(info.state);
        status::mark_created_or_updated(vpc, reason);
        Ok(())
    }

    async fn get(&self, avn: &dyn ControlPlane, vpc: &mut ProjectVpc) -> Result<Option<Secret>, HandlerError> {
        let id = vpc
            .remote_id()
            .ok_or_else(|| AivenError::NotFound("project vpc has no recorded id".to_string()))?
            .to_string();
        let info = avn.get_project_vpc(&vpc.spec.project, &id).await?;
        vpc.status_or_default().state = Some(info.state.clone());
        if info.state == VPC_STATE_ACTIVE {
            status::mark_running(vpc);
        } else {
            status::mark_not_running(vpc, &info.state);
        }
        Ok(None)
    }

    async fn delete(&self, avn: &dyn ControlPlane, vpc: &ProjectVpc) -> Result<bool, HandlerError> {
        match find_existing(avn, vpc).await? {
            Some(info) => deleted(avn.delete_project_vpc(&vpc.spec.project, &info.project_vpc_id).await),
            None => Ok(true),
        }
    }
}
