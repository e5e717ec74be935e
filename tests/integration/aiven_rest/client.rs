//! `AivenRest` request shapes and error classification.

use super::mock_server::{self, TOKEN};
use aiven_operator::provider::aiven::{build_http_client, AivenRest};
use aiven_operator::provider::memory::Operation;
use aiven_operator::provider::types::{
    CreateDatabaseRequest, CreateKafkaAclRequest, CreateProjectVpcRequest, CreateServiceRequest,
};
use aiven_operator::provider::{AivenError, ControlPlane};
use std::time::Duration;
use zeroize::Zeroizing;

const PROJECT: &str = "acme";

fn rest(base_url: &str, token: &str) -> AivenRest {
    let http = build_http_client(Duration::from_secs(5)).unwrap();
    AivenRest::new(http, base_url, Zeroizing::new(token.to_string())).unwrap()
}

fn create_pg(name: &str) -> CreateServiceRequest {
    CreateServiceRequest {
        service_name: name.to_string(),
        service_type: "pg".to_string(),
        plan: "startup-4".to_string(),
        cloud: Some("google-europe-west1".to_string()),
        disk_space_mb: None,
        maintenance: None,
        project_vpc_id: None,
        service_integrations: Vec::new(),
        termination_protection: false,
        user_config: None,
    }
}

#[tokio::test]
async fn test_service_round_trip() {
    let server = mock_server::start().await;
    let client = rest(&server.base_url, TOKEN);

    let created = client.create_service(PROJECT, &create_pg("pg-main")).await.unwrap();
    assert_eq!(created.service_name, "pg-main");
    assert_eq!(created.service_type, "pg");

    let fetched = client.get_service(PROJECT, "pg-main").await.unwrap();
    assert_eq!(fetched, server.avn.service(PROJECT, "pg-main").unwrap());

    client.delete_service(PROJECT, "pg-main").await.unwrap();
    assert!(server.avn.service(PROJECT, "pg-main").is_none());
}

#[tokio::test]
async fn test_error_answers_are_classified() {
    let server = mock_server::start().await;
    let client = rest(&server.base_url, TOKEN);

    let missing = client.get_service(PROJECT, "nope").await.unwrap_err();
    assert!(missing.is_not_found(), "got {missing:?}");

    client.create_service(PROJECT, &create_pg("pg-main")).await.unwrap();
    let duplicate = client.create_service(PROJECT, &create_pg("pg-main")).await.unwrap_err();
    assert!(duplicate.is_already_exists(), "got {duplicate:?}");

    server
        .avn
        .fail_next(Operation::GetService, AivenError::Transient("maintenance".to_string()));
    let busy = client.get_service(PROJECT, "pg-main").await.unwrap_err();
    assert!(busy.is_transient(), "got {busy:?}");
    // The injected failure is consumed
    client.get_service(PROJECT, "pg-main").await.unwrap();
}

#[tokio::test]
async fn test_bad_token_is_rejected() {
    let server = mock_server::start().await;
    let client = rest(&server.base_url, "wrong-token");

    let error = client.get_service(PROJECT, "pg-main").await.unwrap_err();
    assert_eq!(
        error,
        AivenError::Api {
            status: 403,
            message: "Invalid token".to_string()
        }
    );
    assert_eq!(server.avn.calls(Operation::GetService), 0);
}

#[tokio::test]
async fn test_database_lookup_goes_through_the_list() {
    let server = mock_server::start().await;
    server.avn.put_running_service(PROJECT, "pg-main", "pg");
    let client = rest(&server.base_url, TOKEN);

    let request = CreateDatabaseRequest {
        database: "orders".to_string(),
        lc_collate: "en_US.UTF-8".to_string(),
        lc_ctype: "en_US.UTF-8".to_string(),
    };
    client.create_database(PROJECT, "pg-main", &request).await.unwrap();

    let found = client.get_database(PROJECT, "pg-main", "orders").await.unwrap();
    assert_eq!(found.database_name, "orders");
    let absent = client.get_database(PROJECT, "pg-main", "billing").await.unwrap_err();
    assert!(absent.is_not_found());

    client.delete_database(PROJECT, "pg-main", "orders").await.unwrap();
    assert!(server.avn.databases(PROJECT, "pg-main").is_empty());
}

#[tokio::test]
async fn test_kafka_acl_create_picks_the_new_entry() {
    let server = mock_server::start().await;
    server.avn.put_running_service(PROJECT, "events", "kafka");
    let client = rest(&server.base_url, TOKEN);

    let first = CreateKafkaAclRequest {
        permission: "read".to_string(),
        topic: "orders".to_string(),
        username: "reader".to_string(),
    };
    let second = CreateKafkaAclRequest {
        permission: "write".to_string(),
        topic: "payments".to_string(),
        username: "writer".to_string(),
    };
    client.create_kafka_acl(PROJECT, "events", &first).await.unwrap();
    let created = client.create_kafka_acl(PROJECT, "events", &second).await.unwrap();
    assert_eq!(created.topic, "payments");
    assert_eq!(created.username, "writer");

    let fetched = client.get_kafka_acl(PROJECT, "events", &created.id).await.unwrap();
    assert_eq!(fetched, created);
    assert_eq!(client.list_kafka_acls(PROJECT, "events").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_project_vpc_uses_bare_bodies() {
    let server = mock_server::start().await;
    let client = rest(&server.base_url, TOKEN);

    let request = CreateProjectVpcRequest {
        cloud_name: "google-europe-west1".to_string(),
        network_cidr: "10.10.0.0/24".to_string(),
    };
    let vpc = client.create_project_vpc(PROJECT, &request).await.unwrap();
    assert_eq!(vpc.state, "APPROVED");
    assert_eq!(vpc.network_cidr, "10.10.0.0/24");

    server.avn.set_vpc_state(PROJECT, &vpc.project_vpc_id, "ACTIVE");
    let fetched = client.get_project_vpc(PROJECT, &vpc.project_vpc_id).await.unwrap();
    assert_eq!(fetched.state, "ACTIVE");

    let listed = client.list_project_vpcs(PROJECT).await.unwrap();
    assert_eq!(listed, vec![fetched]);
}
