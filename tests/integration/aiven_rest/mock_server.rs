//! Axum mock of the Aiven REST API.
//!
//! Every route delegates to a [`MemoryControlPlane`], so the mock answers exactly
//! like the in-memory control plane, translated to HTTP.

use aiven_operator::provider::aiven::paths::routes;
use aiven_operator::provider::memory::MemoryControlPlane;
use aiven_operator::provider::types::{
    CreateDatabaseRequest, CreateKafkaAclRequest, CreateProjectVpcRequest, CreateServiceIntegrationRequest,
    CreateServiceRequest, DatabaseInfo, UpdateServiceIntegrationRequest, UpdateServiceRequest,
};
use aiven_operator::provider::{AivenError, AivenResult, ControlPlane};
use axum::extract::{Path, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub const TOKEN: &str = "test-token";

type AppState = Arc<MemoryControlPlane>;

/// Running mock server
pub struct MockAiven {
    pub avn: Arc<MemoryControlPlane>,
    /// API base, e.g. `http://127.0.0.1:41234/v1`
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl Drop for MockAiven {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn start() -> MockAiven {
    let avn = Arc::new(MemoryControlPlane::new());
    let api = Router::new()
        .route(routes::SERVICES, post(create_service))
        .route(
            routes::SERVICE,
            get(get_service).put(update_service).delete(delete_service),
        )
        .route(routes::DATABASES, get(list_databases).post(create_database))
        .route(routes::DATABASE, axum::routing::delete(delete_database))
        .route(routes::KAFKA_ACLS, get(list_kafka_acls).post(create_kafka_acl))
        .route(routes::KAFKA_ACL, axum::routing::delete(delete_kafka_acl))
        .route(routes::INTEGRATIONS, get(list_project_integrations).post(create_integration))
        .route(
            routes::INTEGRATION,
            get(get_integration).put(update_integration).delete(delete_integration),
        )
        .route(routes::SERVICE_INTEGRATIONS, get(list_service_integrations))
        .route(routes::VPCS, get(list_vpcs).post(create_vpc))
        .route(routes::VPC, get(get_vpc).delete(delete_vpc))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(require_token)),
        )
        .with_state(Arc::clone(&avn));
    let app = Router::new().nest("/v1", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockAiven {
        avn,
        base_url: format!("http://{addr}/v1"),
        handle,
    }
}

async fn require_token(request: Request, next: Next) -> Response {
    let expected = format!("aivenv1 {TOKEN}");
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return error_response(&AivenError::Api {
            status: 403,
            message: "Invalid token".to_string(),
        });
    }
    next.run(request).await
}

fn error_response(error: &AivenError) -> Response {
    let status = match error {
        AivenError::NotFound(_) => StatusCode::NOT_FOUND,
        AivenError::AlreadyExists(_) => StatusCode::CONFLICT,
        AivenError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        AivenError::Api { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
        AivenError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = json!({
        "message": error.message(),
        "errors": [{"message": error.message(), "status": status.as_u16()}],
    });
    (status, Json(body)).into_response()
}

/// Wrap a successful value in its envelope field, or answer with the error
fn reply<T: Serialize>(envelope: &str, result: AivenResult<T>) -> Response {
    match result {
        Ok(value) => Json(json!({ envelope: value })).into_response(),
        Err(e) => error_response(&e),
    }
}

fn reply_bare<T: Serialize>(result: AivenResult<T>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(e) => error_response(&e),
    }
}

fn reply_empty(result: AivenResult<()>) -> Response {
    match result {
        Ok(()) => Json(json!({"message": "completed"})).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn get_service(State(avn): State<AppState>, Path((project, service)): Path<(String, String)>) -> Response {
    reply("service", avn.get_service(&project, &service).await)
}

async fn create_service(
    State(avn): State<AppState>,
    Path(project): Path<String>,
    Json(request): Json<CreateServiceRequest>,
) -> Response {
    reply("service", avn.create_service(&project, &request).await)
}

async fn update_service(
    State(avn): State<AppState>,
    Path((project, service)): Path<(String, String)>,
    Json(request): Json<UpdateServiceRequest>,
) -> Response {
    reply("service", avn.update_service(&project, &service, &request).await)
}

async fn delete_service(State(avn): State<AppState>, Path((project, service)): Path<(String, String)>) -> Response {
    reply_empty(avn.delete_service(&project, &service).await)
}

async fn list_databases(State(avn): State<AppState>, Path((project, service)): Path<(String, String)>) -> Response {
    if avn.service(&project, &service).is_none() {
        return error_response(&AivenError::NotFound("Service not found".to_string()));
    }
    let databases: Vec<DatabaseInfo> = avn
        .databases(&project, &service)
        .into_iter()
        .map(|database_name| DatabaseInfo {
            database_name,
            ..DatabaseInfo::default()
        })
        .collect();
    reply("databases", Ok(databases))
}

async fn create_database(
    State(avn): State<AppState>,
    Path((project, service)): Path<(String, String)>,
    Json(request): Json<CreateDatabaseRequest>,
) -> Response {
    reply_empty(avn.create_database(&project, &service, &request).await)
}

async fn delete_database(
    State(avn): State<AppState>,
    Path((project, service, database)): Path<(String, String, String)>,
) -> Response {
    reply_empty(avn.delete_database(&project, &service, &database).await)
}

async fn list_kafka_acls(State(avn): State<AppState>, Path((project, service)): Path<(String, String)>) -> Response {
    reply("acl", avn.list_kafka_acls(&project, &service).await)
}

/// Aiven answers with the whole ACL list of the service
async fn create_kafka_acl(
    State(avn): State<AppState>,
    Path((project, service)): Path<(String, String)>,
    Json(request): Json<CreateKafkaAclRequest>,
) -> Response {
    if let Err(e) = avn.create_kafka_acl(&project, &service, &request).await {
        return error_response(&e);
    }
    reply("acl", Ok(avn.kafka_acls(&project, &service)))
}

async fn delete_kafka_acl(
    State(avn): State<AppState>,
    Path((project, service, acl_id)): Path<(String, String, String)>,
) -> Response {
    reply_empty(avn.delete_kafka_acl(&project, &service, &acl_id).await)
}

async fn list_project_integrations(State(avn): State<AppState>, Path(project): Path<String>) -> Response {
    reply(
        "service_integrations",
        avn.list_project_integrations(&project).await,
    )
}

async fn create_integration(
    State(avn): State<AppState>,
    Path(project): Path<String>,
    Json(request): Json<CreateServiceIntegrationRequest>,
) -> Response {
    reply(
        "service_integration",
        avn.create_service_integration(&project, &request).await,
    )
}

async fn get_integration(
    State(avn): State<AppState>,
    Path((project, integration_id)): Path<(String, String)>,
) -> Response {
    reply(
        "service_integration",
        avn.get_service_integration(&project, &integration_id).await,
    )
}

async fn update_integration(
    State(avn): State<AppState>,
    Path((project, integration_id)): Path<(String, String)>,
    Json(request): Json<UpdateServiceIntegrationRequest>,
) -> Response {
    reply(
        "service_integration",
        avn.update_service_integration(&project, &integration_id, &request)
            .await,
    )
}

async fn delete_integration(
    State(avn): State<AppState>,
    Path((project, integration_id)): Path<(String, String)>,
) -> Response {
    reply_empty(avn.delete_service_integration(&project, &integration_id).await)
}

async fn list_service_integrations(
    State(avn): State<AppState>,
    Path((project, service)): Path<(String, String)>,
) -> Response {
    reply(
        "service_integrations",
        avn.list_service_integrations(&project, &service).await,
    )
}

async fn list_vpcs(State(avn): State<AppState>, Path(project): Path<String>) -> Response {
    reply("vpcs", avn.list_project_vpcs(&project).await)
}

async fn create_vpc(
    State(avn): State<AppState>,
    Path(project): Path<String>,
    Json(request): Json<CreateProjectVpcRequest>,
) -> Response {
    reply_bare(avn.create_project_vpc(&project, &request).await)
}

async fn get_vpc(State(avn): State<AppState>, Path((project, vpc_id)): Path<(String, String)>) -> Response {
    reply_bare(avn.get_project_vpc(&project, &vpc_id).await)
}

async fn delete_vpc(State(avn): State<AppState>, Path((project, vpc_id)): Path<(String, String)>) -> Response {
    reply_empty(avn.delete_project_vpc(&project, &vpc_id).await)
}
