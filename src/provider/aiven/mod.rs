//! # Aiven REST Client
//!
//! [`ControlPlane`] implementation over the Aiven REST API v1.
//!
//! Requests authenticate with `Authorization: aivenv1 <token>`. HTTP error answers
//! are classified by [`AivenError::from_status`].

pub mod paths;
mod responses;

use crate::provider::types::{
    CreateDatabaseRequest, CreateKafkaAclRequest, CreateProjectVpcRequest, CreateServiceIntegrationRequest,
    CreateServiceRequest, DatabaseInfo, KafkaAclInfo, ProjectVpcInfo, ServiceInfo, ServiceIntegrationInfo,
    UpdateServiceIntegrationRequest, UpdateServiceRequest,
};
use crate::observability::metrics;
use crate::provider::{AivenError, AivenResult, ControlPlane};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Url};
use responses::{
    DatabaseListEnvelope, ErrorBody, IntegrationEnvelope, IntegrationListEnvelope, KafkaAclListEnvelope,
    ServiceEnvelope, VpcListEnvelope,
};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use zeroize::Zeroizing;

/// Build the shared HTTP client used by every [`AivenRest`]
///
/// # Errors
///
/// Returns an error when the TLS backend cannot be initialized.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("aiven-operator/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
}

/// Aiven REST API client bound to one token
#[derive(Clone)]
pub struct AivenRest {
    http: Client,
    base_url: Url,
    token: Arc<Zeroizing<String>>,
}

impl fmt::Debug for AivenRest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AivenRest")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl AivenRest {
    /// Create a client for `base_url` (e.g. `https://api.aiven.io/v1`)
    ///
    /// # Errors
    ///
    /// Returns an error when `base_url` is not an absolute http(s) URL.
    pub fn new(http: Client, base_url: &str, token: Zeroizing<String>) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid Aiven API URL '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Aiven API URL '{base_url}' cannot carry a path"));
        }
        Ok(Self {
            http,
            base_url,
            token: Arc::new(token),
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(AUTHORIZATION, format!("aivenv1 {}", self.token.as_str()))
    }

    async fn execute(&self, request: RequestBuilder) -> AivenResult<reqwest::Response> {
        let request = self.authorized(request).build()?;
        let method = request.method().to_string();
        let started = Instant::now();
        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_api_request(&method, "error", started.elapsed().as_secs_f64());
                return Err(e.into());
            }
        };
        let status = response.status();
        metrics::record_api_request(&method, status.as_str(), started.elapsed().as_secs_f64());
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let error = AivenError::from_status(status.as_u16(), ErrorBody::message_from(&body));
        debug!(status = status.as_u16(), error = %error, "Aiven API request failed");
        Err(error)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> AivenResult<T> {
        let response = self.execute(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AivenError::Decode(e.to_string()))
    }

    async fn send_empty(&self, request: RequestBuilder) -> AivenResult<()> {
        self.execute(request).await.map(drop)
    }
}

#[async_trait]
impl ControlPlane for AivenRest {
    async fn get_service(&self, project: &str, service: &str) -> AivenResult<ServiceInfo> {
        let url = self.url(&paths::service(project, service));
        let envelope: ServiceEnvelope = self.send(self.http.get(url)).await?;
        Ok(envelope.service)
    }

    async fn create_service(&self, project: &str, request: &CreateServiceRequest) -> AivenResult<ServiceInfo> {
        let url = self.url(&paths::services(project));
        let envelope: ServiceEnvelope = self.send(self.http.post(url).json(request)).await?;
        Ok(envelope.service)
    }

    async fn update_service(
        &self,
        project: &str,
        service: &str,
        request: &UpdateServiceRequest,
    ) -> AivenResult<ServiceInfo> {
        let url = self.url(&paths::service(project, service));
        let envelope: ServiceEnvelope = self.send(self.http.put(url).json(request)).await?;
        Ok(envelope.service)
    }

    async fn delete_service(&self, project: &str, service: &str) -> AivenResult<()> {
        let url = self.url(&paths::service(project, service));
        self.send_empty(self.http.delete(url)).await
    }

    async fn get_database(&self, project: &str, service: &str, database: &str) -> AivenResult<DatabaseInfo> {
        // There is no single-database endpoint; the list is small
        let url = self.url(&paths::databases(project, service));
        let envelope: DatabaseListEnvelope = self.send(self.http.get(url)).await?;
        envelope
            .databases
            .into_iter()
            .find(|db| db.database_name == database)
            .ok_or_else(|| AivenError::NotFound(format!("database {project}/{service}/{database}")))
    }

    async fn create_database(
        &self,
        project: &str,
        service: &str,
        request: &CreateDatabaseRequest,
    ) -> AivenResult<()> {
        let url = self.url(&paths::databases(project, service));
        self.send_empty(self.http.post(url).json(request)).await
    }

    async fn delete_database(&self, project: &str, service: &str, database: &str) -> AivenResult<()> {
        let url = self.url(&paths::database(project, service, database));
        self.send_empty(self.http.delete(url)).await
    }

    async fn get_kafka_acl(&self, project: &str, service: &str, acl_id: &str) -> AivenResult<KafkaAclInfo> {
        self.list_kafka_acls(project, service)
            .await?
            .into_iter()
            .find(|acl| acl.id == acl_id)
            .ok_or_else(|| AivenError::NotFound(format!("kafka acl {project}/{service}/{acl_id}")))
    }

    async fn list_kafka_acls(&self, project: &str, service: &str) -> AivenResult<Vec<KafkaAclInfo>> {
        let url = self.url(&paths::kafka_acls(project, service));
        let envelope: KafkaAclListEnvelope = self.send(self.http.get(url)).await?;
        Ok(envelope.acl)
    }

    async fn create_kafka_acl(
        &self,
        project: &str,
        service: &str,
        request: &CreateKafkaAclRequest,
    ) -> AivenResult<KafkaAclInfo> {
        // The answer is the full ACL list of the service
        let url = self.url(&paths::kafka_acls(project, service));
        let envelope: KafkaAclListEnvelope = self.send(self.http.post(url).json(request)).await?;
        envelope
            .acl
            .into_iter()
            .find(|acl| request.matches(acl))
            .ok_or_else(|| AivenError::Decode("created ACL missing from the response".to_string()))
    }

    async fn delete_kafka_acl(&self, project: &str, service: &str, acl_id: &str) -> AivenResult<()> {
        let url = self.url(&paths::kafka_acl(project, service, acl_id));
        self.send_empty(self.http.delete(url)).await
    }

    async fn get_service_integration(
        &self,
        project: &str,
        integration_id: &str,
    ) -> AivenResult<ServiceIntegrationInfo> {
        let url = self.url(&paths::integration(project, integration_id));
        let envelope: IntegrationEnvelope = self.send(self.http.get(url)).await?;
        Ok(envelope.service_integration)
    }

    async fn list_service_integrations(
        &self,
        project: &str,
        service: &str,
    ) -> AivenResult<Vec<ServiceIntegrationInfo>> {
        let url = self.url(&paths::service_integrations(project, service));
        let envelope: IntegrationListEnvelope = self.send(self.http.get(url)).await?;
        Ok(envelope.service_integrations)
    }

    async fn list_project_integrations(&self, project: &str) -> AivenResult<Vec<ServiceIntegrationInfo>> {
        let url = self.url(&paths::integrations(project));
        let envelope: IntegrationListEnvelope = self.send(self.http.get(url)).await?;
        Ok(envelope.service_integrations)
    }

    async fn create_service_integration(
        &self,
        project: &str,
        request: &CreateServiceIntegrationRequest,
    ) -> AivenResult<ServiceIntegrationInfo> {
        let url = self.url(&paths::integrations(project));
        let envelope: IntegrationEnvelope = self.send(self.http.post(url).json(request)).await?;
        Ok(envelope.service_integration)
    }

    async fn update_service_integration(
        &self,
        project: &str,
        integration_id: &str,
        request: &UpdateServiceIntegrationRequest,
    ) -> AivenResult<ServiceIntegrationInfo> {
        let url = self.url(&paths::integration(project, integration_id));
        let envelope: IntegrationEnvelope = self.send(self.http.put(url).json(request)).await?;
        Ok(envelope.service_integration)
    }

    async fn delete_service_integration(&self, project: &str, integration_id: &str) -> AivenResult<()> {
        let url = self.url(&paths::integration(project, integration_id));
        self.send_empty(self.http.delete(url)).await
    }

    async fn get_project_vpc(&self, project: &str, vpc_id: &str) -> AivenResult<ProjectVpcInfo> {
        let url = self.url(&paths::vpc(project, vpc_id));
        self.send(self.http.get(url)).await
    }

    async fn list_project_vpcs(&self, project: &str) -> AivenResult<Vec<ProjectVpcInfo>> {
        let url = self.url(&paths::vpcs(project));
        let envelope: VpcListEnvelope = self.send(self.http.get(url)).await?;
        Ok(envelope.vpcs)
    }

    async fn create_project_vpc(
        &self,
        project: &str,
        request: &CreateProjectVpcRequest,
    ) -> AivenResult<ProjectVpcInfo> {
        let url = self.url(&paths::vpcs(project));
        self.send(self.http.post(url).json(request)).await
    }

    async fn delete_project_vpc(&self, project: &str, vpc_id: &str) -> AivenResult<()> {
        let url = self.url(&paths::vpc(project, vpc_id));
        self.send_empty(self.http.delete(url)).await
    }
}
