//! # In-Memory Control Plane
//!
//! A [`ControlPlane`] kept entirely in process. It behaves like the Aiven API where
//! the engine can observe it (not-found and already-exists signals, termination
//! protection, service states) and records how often each operation was called.
//! Failures can be injected per operation.

use crate::constants::SERVICE_STATE_RUNNING;
use crate::provider::types::{
    CreateDatabaseRequest, CreateKafkaAclRequest, CreateProjectVpcRequest, CreateServiceIntegrationRequest,
    CreateServiceRequest, DatabaseInfo, KafkaAclInfo, ProjectVpcInfo, ServiceInfo, ServiceIntegrationInfo,
    ServiceUser, UpdateServiceIntegrationRequest, UpdateServiceRequest,
};
use crate::provider::{AivenError, AivenResult, ControlPlane};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Control-plane operations, used to count calls and inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetService,
    CreateService,
    UpdateService,
    DeleteService,
    GetDatabase,
    CreateDatabase,
    DeleteDatabase,
    GetKafkaAcl,
    ListKafkaAcls,
    CreateKafkaAcl,
    DeleteKafkaAcl,
    GetServiceIntegration,
    ListServiceIntegrations,
    ListProjectIntegrations,
    CreateServiceIntegration,
    UpdateServiceIntegration,
    DeleteServiceIntegration,
    GetProjectVpc,
    ListProjectVpcs,
    CreateProjectVpc,
    DeleteProjectVpc,
}

type ServiceKey = (String, String);

#[derive(Debug)]
struct State {
    services: BTreeMap<ServiceKey, ServiceInfo>,
    databases: BTreeMap<ServiceKey, BTreeMap<String, DatabaseInfo>>,
    acls: BTreeMap<ServiceKey, Vec<KafkaAclInfo>>,
    integrations: BTreeMap<ServiceKey, ServiceIntegrationInfo>,
    vpcs: BTreeMap<ServiceKey, ProjectVpcInfo>,
    calls: HashMap<Operation, usize>,
    failures: HashMap<Operation, VecDeque<AivenError>>,
    latency: HashMap<Operation, Duration>,
    last_service_update: Option<UpdateServiceRequest>,
    next_id: u64,
    new_service_state: String,
    new_vpc_state: String,
}

impl State {
    fn record(&mut self, operation: Operation) -> AivenResult<()> {
        *self.calls.entry(operation).or_default() += 1;
        match self.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:08x}", self.next_id)
    }

    fn require_service(&self, project: &str, service: &str) -> AivenResult<()> {
        if self.services.contains_key(&key(project, service)) {
            Ok(())
        } else {
            Err(AivenError::NotFound(format!("service {project}/{service}")))
        }
    }
}

fn key(a: &str, b: &str) -> ServiceKey {
    (a.to_string(), b.to_string())
}

/// In-process Aiven control plane
#[derive(Debug)]
pub struct MemoryControlPlane {
    state: Mutex<State>,
}

impl Default for MemoryControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryControlPlane {
    /// New services start `REBUILDING`, new VPCs start `APPROVED`
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                services: BTreeMap::new(),
                databases: BTreeMap::new(),
                acls: BTreeMap::new(),
                integrations: BTreeMap::new(),
                vpcs: BTreeMap::new(),
                calls: HashMap::new(),
                failures: HashMap::new(),
                latency: HashMap::new(),
                last_service_update: None,
                next_id: 0,
                new_service_state: "REBUILDING".to_string(),
                new_vpc_state: "APPROVED".to_string(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait out the latency of `operation`, then count the call and lock the state
    async fn enter(&self, operation: Operation) -> AivenResult<MutexGuard<'_, State>> {
        let latency = self.lock().latency.get(&operation).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.lock();
        state.record(operation)?;
        Ok(state)
    }

    /// State given to services created from now on
    pub fn set_new_service_state(&self, state: &str) {
        self.lock().new_service_state = state.to_string();
    }

    /// Insert (or replace) a running service of the given type
    pub fn put_running_service(&self, project: &str, service: &str, service_type: &str) {
        let info = sample_service(project, service, service_type, SERVICE_STATE_RUNNING);
        self.lock().services.insert(key(project, service), info);
    }

    /// Change the state of an existing service
    pub fn set_service_state(&self, project: &str, service: &str, state: &str) {
        if let Some(info) = self.lock().services.get_mut(&key(project, service)) {
            info.state = state.to_string();
        }
    }

    /// Drop a service behind the operator's back
    pub fn remove_service(&self, project: &str, service: &str) {
        self.lock().services.remove(&key(project, service));
    }

    #[must_use]
    pub fn service(&self, project: &str, service: &str) -> Option<ServiceInfo> {
        self.lock().services.get(&key(project, service)).cloned()
    }

    /// Body of the most recent accepted service update
    #[must_use]
    pub fn last_service_update(&self) -> Option<UpdateServiceRequest> {
        self.lock().last_service_update.clone()
    }

    #[must_use]
    pub fn service_count(&self) -> usize {
        self.lock().services.len()
    }

    /// Database names of a service
    #[must_use]
    pub fn databases(&self, project: &str, service: &str) -> Vec<String> {
        self.lock()
            .databases
            .get(&key(project, service))
            .map(|dbs| dbs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop a database behind the operator's back
    pub fn remove_database(&self, project: &str, service: &str, database: &str) {
        if let Some(dbs) = self.lock().databases.get_mut(&key(project, service)) {
            dbs.remove(database);
        }
    }

    #[must_use]
    pub fn kafka_acls(&self, project: &str, service: &str) -> Vec<KafkaAclInfo> {
        self.lock()
            .acls
            .get(&key(project, service))
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn integrations(&self, project: &str) -> Vec<ServiceIntegrationInfo> {
        self.lock()
            .integrations
            .iter()
            .filter(|((p, _), _)| p == project)
            .map(|(_, i)| i.clone())
            .collect()
    }

    #[must_use]
    pub fn vpc(&self, project: &str, vpc_id: &str) -> Option<ProjectVpcInfo> {
        self.lock().vpcs.get(&key(project, vpc_id)).cloned()
    }

    pub fn set_vpc_state(&self, project: &str, vpc_id: &str, state: &str) {
        if let Some(vpc) = self.lock().vpcs.get_mut(&key(project, vpc_id)) {
            vpc.state = state.to_string();
        }
    }

    /// Number of calls made to an operation
    #[must_use]
    pub fn calls(&self, operation: Operation) -> usize {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Delay every call of `operation` by `latency`; zero removes the delay
    pub fn set_latency(&self, operation: Operation, latency: Duration) {
        let mut state = self.lock();
        if latency.is_zero() {
            state.latency.remove(&operation);
        } else {
            state.latency.insert(operation, latency);
        }
    }

    /// Make the next call of `operation` fail with `error`
    pub fn fail_next(&self, operation: Operation, error: AivenError) {
        self.lock().failures.entry(operation).or_default().push_back(error);
    }
}

/// Service as Aiven would report it, with connection parameters filled in
fn sample_service(project: &str, service: &str, service_type: &str, state: &str) -> ServiceInfo {
    let host = format!("{service}-{project}.aivencloud.com");
    let port = "12691".to_string();
    let password = format!("{service}-password");

    let mut params = BTreeMap::from([
        ("host".to_string(), host.clone()),
        ("port".to_string(), port.clone()),
        ("user".to_string(), "avnadmin".to_string()),
        ("password".to_string(), password.clone()),
    ]);
    let service_uri = if service_type == "pg" {
        params.insert("dbname".to_string(), "defaultdb".to_string());
        params.insert("sslmode".to_string(), "require".to_string());
        format!("postgres://avnadmin:{password}@{host}:{port}/defaultdb?sslmode=require")
    } else {
        format!("{host}:{port}")
    };

    ServiceInfo {
        service_name: service.to_string(),
        service_type: service_type.to_string(),
        state: state.to_string(),
        plan: "startup-4".to_string(),
        cloud_name: "google-europe-west1".to_string(),
        service_uri: Some(service_uri),
        service_uri_params: params,
        users: vec![ServiceUser {
            username: "avnadmin".to_string(),
            password: Some(password),
            access_cert: Some(format!("{service}-cert")),
            access_key: Some(format!("{service}-key")),
        }],
        ..ServiceInfo::default()
    }
}

#[async_trait]
impl ControlPlane for MemoryControlPlane {
    async fn get_service(&self, project: &str, service: &str) -> AivenResult<ServiceInfo> {
        let state = self.enter(Operation::GetService).await?;
        state
            .services
            .get(&key(project, service))
            .cloned()
            .ok_or_else(|| AivenError::NotFound(format!("service {project}/{service}")))
    }

    async fn create_service(&self, project: &str, request: &CreateServiceRequest) -> AivenResult<ServiceInfo> {
        let mut state = self.enter(Operation::CreateService).await?;
        let service_key = key(project, &request.service_name);
        if state.services.contains_key(&service_key) {
            return Err(AivenError::AlreadyExists(format!(
                "service {project}/{}",
                request.service_name
            )));
        }
        let mut info = sample_service(
            project,
            &request.service_name,
            &request.service_type,
            &state.new_service_state,
        );
        info.plan.clone_from(&request.plan);
        if let Some(cloud) = &request.cloud {
            info.cloud_name.clone_from(cloud);
        }
        info.project_vpc_id.clone_from(&request.project_vpc_id);
        info.termination_protection = request.termination_protection;
        state.services.insert(service_key, info.clone());
        Ok(info)
    }

    async fn update_service(
        &self,
        project: &str,
        service: &str,
        request: &UpdateServiceRequest,
    ) -> AivenResult<ServiceInfo> {
        let mut state = self.enter(Operation::UpdateService).await?;
        let info = state
            .services
            .get_mut(&key(project, service))
            .ok_or_else(|| AivenError::NotFound(format!("service {project}/{service}")))?;
        info.plan.clone_from(&request.plan);
        if let Some(cloud) = &request.cloud {
            info.cloud_name.clone_from(cloud);
        }
        info.project_vpc_id.clone_from(&request.project_vpc_id);
        info.termination_protection = request.termination_protection;
        let info = info.clone();
        state.last_service_update = Some(request.clone());
        Ok(info)
    }

    async fn delete_service(&self, project: &str, service: &str) -> AivenResult<()> {
        let mut state = self.enter(Operation::DeleteService).await?;
        let service_key = key(project, service);
        match state.services.get(&service_key) {
            None => Err(AivenError::NotFound(format!("service {project}/{service}"))),
            Some(info) if info.termination_protection => Err(AivenError::Api {
                status: 403,
                message: "Service is protected against termination".to_string(),
            }),
            Some(_) => {
                state.services.remove(&service_key);
                state.databases.remove(&service_key);
                state.acls.remove(&service_key);
                Ok(())
            }
        }
    }

    async fn get_database(&self, project: &str, service: &str, database: &str) -> AivenResult<DatabaseInfo> {
        let state = self.enter(Operation::GetDatabase).await?;
        state.require_service(project, service)?;
        state
            .databases
            .get(&key(project, service))
            .and_then(|dbs| dbs.get(database))
            .cloned()
            .ok_or_else(|| AivenError::NotFound(format!("database {project}/{service}/{database}")))
    }

    async fn create_database(
        &self,
        project: &str,
        service: &str,
        request: &CreateDatabaseRequest,
    ) -> AivenResult<()> {
        let mut state = self.enter(Operation::CreateDatabase).await?;
        state.require_service(project, service)?;
        let dbs = state.databases.entry(key(project, service)).or_default();
        if dbs.contains_key(&request.database) {
            return Err(AivenError::AlreadyExists(format!(
                "database {project}/{service}/{}",
                request.database
            )));
        }
        dbs.insert(
            request.database.clone(),
            DatabaseInfo {
                database_name: request.database.clone(),
                lc_collate: Some(request.lc_collate.clone()),
                lc_ctype: Some(request.lc_ctype.clone()),
            },
        );
        Ok(())
    }

    async fn delete_database(&self, project: &str, service: &str, database: &str) -> AivenResult<()> {
        let mut state = self.enter(Operation::DeleteDatabase).await?;
        state
            .databases
            .get_mut(&key(project, service))
            .and_then(|dbs| dbs.remove(database))
            .map(drop)
            .ok_or_else(|| AivenError::NotFound(format!("database {project}/{service}/{database}")))
    }

    async fn get_kafka_acl(&self, project: &str, service: &str, acl_id: &str) -> AivenResult<KafkaAclInfo> {
        let state = self.enter(Operation::GetKafkaAcl).await?;
        state
            .acls
            .get(&key(project, service))
            .and_then(|acls| acls.iter().find(|acl| acl.id == acl_id))
            .cloned()
            .ok_or_else(|| AivenError::NotFound(format!("kafka acl {project}/{service}/{acl_id}")))
    }

    async fn list_kafka_acls(&self, project: &str, service: &str) -> AivenResult<Vec<KafkaAclInfo>> {
        let state = self.enter(Operation::ListKafkaAcls).await?;
        state.require_service(project, service)?;
        Ok(state.acls.get(&key(project, service)).cloned().unwrap_or_default())
    }

    async fn create_kafka_acl(
        &self,
        project: &str,
        service: &str,
        request: &CreateKafkaAclRequest,
    ) -> AivenResult<KafkaAclInfo> {
        let mut state = self.enter(Operation::CreateKafkaAcl).await?;
        state.require_service(project, service)?;
        if state
            .acls
            .get(&key(project, service))
            .is_some_and(|acls| acls.iter().any(|acl| request.matches(acl)))
        {
            return Err(AivenError::AlreadyExists(format!(
                "kafka acl {}:{}:{}",
                request.topic, request.username, request.permission
            )));
        }
        let acl = KafkaAclInfo {
            id: state.next_id("acl"),
            permission: request.permission.clone(),
            topic: request.topic.clone(),
            username: request.username.clone(),
        };
        state
            .acls
            .entry(key(project, service))
            .or_default()
            .push(acl.clone());
        Ok(acl)
    }

    async fn delete_kafka_acl(&self, project: &str, service: &str, acl_id: &str) -> AivenResult<()> {
        let mut state = self.enter(Operation::DeleteKafkaAcl).await?;
        let acls = state
            .acls
            .get_mut(&key(project, service))
            .ok_or_else(|| AivenError::NotFound(format!("kafka acl {project}/{service}/{acl_id}")))?;
        let before = acls.len();
        acls.retain(|acl| acl.id != acl_id);
        if acls.len() == before {
            return Err(AivenError::NotFound(format!("kafka acl {project}/{service}/{acl_id}")));
        }
        Ok(())
    }

    async fn get_service_integration(
        &self,
        project: &str,
        integration_id: &str,
    ) -> AivenResult<ServiceIntegrationInfo> {
        let state = self.enter(Operation::GetServiceIntegration).await?;
        state
            .integrations
            .get(&key(project, integration_id))
            .cloned()
            .ok_or_else(|| AivenError::NotFound(format!("integration {project}/{integration_id}")))
    }

    async fn list_service_integrations(
        &self,
        project: &str,
        service: &str,
    ) -> AivenResult<Vec<ServiceIntegrationInfo>> {
        let state = self.enter(Operation::ListServiceIntegrations).await?;
        Ok(state
            .integrations
            .iter()
            .filter(|((p, _), i)| {
                p == project
                    && (i.source_service.as_deref() == Some(service)
                        || i.dest_service.as_deref() == Some(service))
            })
            .map(|(_, i)| i.clone())
            .collect())
    }

    async fn list_project_integrations(&self, project: &str) -> AivenResult<Vec<ServiceIntegrationInfo>> {
        let state = self.enter(Operation::ListProjectIntegrations).await?;
        Ok(state
            .integrations
            .iter()
            .filter(|((p, _), _)| p == project)
            .map(|(_, i)| i.clone())
            .collect())
    }

    async fn create_service_integration(
        &self,
        project: &str,
        request: &CreateServiceIntegrationRequest,
    ) -> AivenResult<ServiceIntegrationInfo> {
        let mut state = self.enter(Operation::CreateServiceIntegration).await?;
        let id = state.next_id("int");
        let integration = ServiceIntegrationInfo {
            service_integration_id: id.clone(),
            integration_type: request.integration_type.clone(),
            source_project: request.source_project.clone(),
            source_service: request.source_service.clone(),
            dest_project: request.dest_project.clone(),
            dest_service: request.dest_service.clone(),
            source_endpoint_id: request.source_endpoint_id.clone(),
            dest_endpoint_id: request.dest_endpoint_id.clone(),
            active: true,
            user_config: request.user_config.clone().unwrap_or_default(),
        };
        state.integrations.insert(key(project, &id), integration.clone());
        Ok(integration)
    }

    async fn update_service_integration(
        &self,
        project: &str,
        integration_id: &str,
        request: &UpdateServiceIntegrationRequest,
    ) -> AivenResult<ServiceIntegrationInfo> {
        let mut state = self.enter(Operation::UpdateServiceIntegration).await?;
        let integration = state
            .integrations
            .get_mut(&key(project, integration_id))
            .ok_or_else(|| AivenError::NotFound(format!("integration {project}/{integration_id}")))?;
        if integration.user_config == request.user_config {
            // Aiven answers an identical update with 400
            return Err(AivenError::Api {
                status: 400,
                message: "user config not changed".to_string(),
            });
        }
        integration.user_config.clone_from(&request.user_config);
        Ok(integration.clone())
    }

    async fn delete_service_integration(&self, project: &str, integration_id: &str) -> AivenResult<()> {
        let mut state = self.enter(Operation::DeleteServiceIntegration).await?;
        state
            .integrations
            .remove(&key(project, integration_id))
            .map(drop)
            .ok_or_else(|| AivenError::NotFound(format!("integration {project}/{integration_id}")))
    }

    async fn get_project_vpc(&self, project: &str, vpc_id: &str) -> AivenResult<ProjectVpcInfo> {
        let state = self.enter(Operation::GetProjectVpc).await?;
        state
            .vpcs
            .get(&key(project, vpc_id))
            .cloned()
            .ok_or_else(|| AivenError::NotFound(format!("vpc {project}/{vpc_id}")))
    }

    async fn list_project_vpcs(&self, project: &str) -> AivenResult<Vec<ProjectVpcInfo>> {
        let state = self.enter(Operation::ListProjectVpcs).await?;
        Ok(state
            .vpcs
            .iter()
            .filter(|((p, _), _)| p == project)
            .map(|(_, vpc)| vpc.clone())
            .collect())
    }

    async fn create_project_vpc(
        &self,
        project: &str,
        request: &CreateProjectVpcRequest,
    ) -> AivenResult<ProjectVpcInfo> {
        let mut state = self.enter(Operation::CreateProjectVpc).await?;
        let vpc = ProjectVpcInfo {
            project_vpc_id: state.next_id("vpc"),
            cloud_name: request.cloud_name.clone(),
            network_cidr: request.network_cidr.clone(),
            state: state.new_vpc_state.clone(),
        };
        state.vpcs.insert(key(project, &vpc.project_vpc_id), vpc.clone());
        Ok(vpc)
    }

    async fn delete_project_vpc(&self, project: &str, vpc_id: &str) -> AivenResult<()> {
        let mut state = self.enter(Operation::DeleteProjectVpc).await?;
        state
            .vpcs
            .remove(&key(project, vpc_id))
            .map(drop)
            .ok_or_else(|| AivenError::NotFound(format!("vpc {project}/{vpc_id}")))
    }
}
