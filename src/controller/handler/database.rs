//! Logical databases inside a PostgreSQL service.

use super::{check_service_is_running, deleted, found, Handler, HandlerError};
use crate::controller::reconciler::status;
use crate::crd::{ConditionReason, Database, ManagedResource};
use crate::provider::types::CreateDatabaseRequest;
use crate::provider::ControlPlane;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::DynamicObject;
use kube::ResourceExt;
use tracing::debug;

/// Handler for [`Database`]; the database name is the resource name
#[derive(Debug, Default, Clone, Copy)]
pub struct DatabaseHandler;

#[async_trait]
impl Handler for DatabaseHandler {
    type Kind = Database;

    async fn check_preconditions(&self, avn: &dyn ControlPlane, db: &Database) -> Result<bool, HandlerError> {
        check_service_is_running(avn, &db.spec.project, &db.spec.service_name).await
    }

    async fn create_or_update(
        &self,
        avn: &dyn ControlPlane,
        db: &mut Database,
        _references: &[DynamicObject],
    ) -> Result<(), HandlerError> {
        let name = db.name_any();
        let project = db.spec.project.clone();
        let service = db.spec.service_name.clone();

        // Databases have no mutable attributes; an existing one is adopted as is.
        let reason = if found(avn.get_database(&project, &service, &name).await)?.is_some() {
            ConditionReason::Updated
        } else {
            let request = CreateDatabaseRequest {
                database: name.clone(),
                lc_collate: db.spec.lc_collate.clone(),
                lc_ctype: db.spec.lc_ctype.clone(),
            };
            match avn.create_database(&project, &service, &request).await {
                Ok(()) => {}
                Err(e) if e.is_already_exists() => {
                    debug!("database {project}/{service}/{name} appeared concurrently, adopting it");
                }
                Err(e) => return Err(e.into()),
            }
            ConditionReason::Created
        };

        status::mark_created_or_updated(db, reason);
        Ok(())
    }

    async fn get(&self, avn: &dyn ControlPlane, db: &mut Database) -> Result<Option<Secret>, HandlerError> {
        avn.get_database(&db.spec.project, &db.spec.service_name, &db.name_any())
            .await?;
        status::mark_running(db);
        Ok(None)
    }

    async fn delete(&self, avn: &dyn ControlPlane, db: &Database) -> Result<bool, HandlerError> {
        if db.termination_protection() {
            return Err(HandlerError::TerminationProtected);
        }
        deleted(
            avn.delete_database(&db.spec.project, &db.spec.service_name, &db.name_any())
                .await,
        )
    }
}
