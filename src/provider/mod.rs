//! # Provider
//!
//! Access to the Aiven control plane.
//!
//! - [`ControlPlane`]: the operations handlers need, one trait object per resource pass
//! - [`aiven::AivenRest`]: REST implementation over `reqwest`
//! - [`memory::MemoryControlPlane`]: in-process implementation for tests and dry runs
//! - [`factory`]: resolves the client (and its token) for a resource

pub mod aiven;
mod error;
pub mod factory;
pub mod memory;
pub mod types;

pub use error::AivenError;
pub use factory::{ClientFactory, CredentialsError, StaticClientFactory, TokenClientFactory};

use async_trait::async_trait;
use types::{
    CreateDatabaseRequest, CreateKafkaAclRequest, CreateProjectVpcRequest, CreateServiceIntegrationRequest,
    CreateServiceRequest, DatabaseInfo, KafkaAclInfo, ProjectVpcInfo, ServiceInfo, ServiceIntegrationInfo,
    UpdateServiceIntegrationRequest, UpdateServiceRequest,
};

/// Result type of control-plane calls
pub type AivenResult<T> = Result<T, AivenError>;

/// Operations of the Aiven control plane used by the handlers
///
/// Every call is a single request/response; missing resources surface as
/// [`AivenError::NotFound`] and duplicate creates as [`AivenError::AlreadyExists`].
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn get_service(&self, project: &str, service: &str) -> AivenResult<ServiceInfo>;
    async fn create_service(&self, project: &str, request: &CreateServiceRequest) -> AivenResult<ServiceInfo>;
    async fn update_service(
        &self,
        project: &str,
        service: &str,
        request: &UpdateServiceRequest,
    ) -> AivenResult<ServiceInfo>;
    async fn delete_service(&self, project: &str, service: &str) -> AivenResult<()>;

    async fn get_database(&self, project: &str, service: &str, database: &str) -> AivenResult<DatabaseInfo>;
    async fn create_database(
        &self,
        project: &str,
        service: &str,
        request: &CreateDatabaseRequest,
    ) -> AivenResult<()>;
    async fn delete_database(&self, project: &str, service: &str, database: &str) -> AivenResult<()>;

    async fn get_kafka_acl(&self, project: &str, service: &str, acl_id: &str) -> AivenResult<KafkaAclInfo>;
    async fn list_kafka_acls(&self, project: &str, service: &str) -> AivenResult<Vec<KafkaAclInfo>>;
    async fn create_kafka_acl(
        &self,
        project: &str,
        service: &str,
        request: &CreateKafkaAclRequest,
    ) -> AivenResult<KafkaAclInfo>;
    async fn delete_kafka_acl(&self, project: &str, service: &str, acl_id: &str) -> AivenResult<()>;

    async fn get_service_integration(
        &self,
        project: &str,
        integration_id: &str,
    ) -> AivenResult<ServiceIntegrationInfo>;
    /// Integrations attached to a service, as source or destination
    async fn list_service_integrations(
        &self,
        project: &str,
        service: &str,
    ) -> AivenResult<Vec<ServiceIntegrationInfo>>;
    async fn create_service_integration(
        &self,
        project: &str,
        request: &CreateServiceIntegrationRequest,
    ) -> AivenResult<ServiceIntegrationInfo>;
    /// Every integration of the project
    async fn list_project_integrations(&self, project: &str) -> AivenResult<Vec<ServiceIntegrationInfo>>;
    async fn update_service_integration(
        &self,
        project: &str,
        integration_id: &str,
        request: &UpdateServiceIntegrationRequest,
    ) -> AivenResult<ServiceIntegrationInfo>;
    async fn delete_service_integration(&self, project: &str, integration_id: &str) -> AivenResult<()>;

    async fn get_project_vpc(&self, project: &str, vpc_id: &str) -> AivenResult<ProjectVpcInfo>;
    async fn list_project_vpcs(&self, project: &str) -> AivenResult<Vec<ProjectVpcInfo>>;
    async fn create_project_vpc(
        &self,
        project: &str,
        request: &CreateProjectVpcRequest,
    ) -> AivenResult<ProjectVpcInfo>;
    async fn delete_project_vpc(&self, project: &str, vpc_id: &str) -> AivenResult<()>;
}
