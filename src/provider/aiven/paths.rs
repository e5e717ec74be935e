//! Aiven API paths, shared by the REST client and the mock server used in tests.
//!
//! Client paths are segment lists so that names are percent-encoded when joined
//! onto the base URL. Route constants use Axum's `{param}` syntax.

pub fn services(project: &str) -> Vec<&str> {
    vec!["project", project, "service"]
}

pub fn service<'a>(project: &'a str, service: &'a str) -> Vec<&'a str> {
    vec!["project", project, "service", service]
}

pub fn databases<'a>(project: &'a str, service: &'a str) -> Vec<&'a str> {
    vec!["project", project, "service", service, "db"]
}

pub fn database<'a>(project: &'a str, service: &'a str, database: &'a str) -> Vec<&'a str> {
    vec!["project", project, "service", service, "db", database]
}

pub fn kafka_acls<'a>(project: &'a str, service: &'a str) -> Vec<&'a str> {
    vec!["project", project, "service", service, "acl"]
}

pub fn kafka_acl<'a>(project: &'a str, service: &'a str, acl_id: &'a str) -> Vec<&'a str> {
    vec!["project", project, "service", service, "acl", acl_id]
}

pub fn integrations(project: &str) -> Vec<&str> {
    vec!["project", project, "integration"]
}

pub fn integration<'a>(project: &'a str, integration_id: &'a str) -> Vec<&'a str> {
    vec!["project", project, "integration", integration_id]
}

pub fn service_integrations<'a>(project: &'a str, service: &'a str) -> Vec<&'a str> {
    vec!["project", project, "service", service, "integration"]
}

pub fn vpcs(project: &str) -> Vec<&str> {
    vec!["project", project, "vpcs"]
}

pub fn vpc<'a>(project: &'a str, vpc_id: &'a str) -> Vec<&'a str> {
    vec!["project", project, "vpcs", vpc_id]
}

/// Axum route patterns, relative to the API base
pub mod routes {
    pub const SERVICES: &str = "/project/{project}/service";
    pub const SERVICE: &str = "/project/{project}/service/{service}";
    pub const DATABASES: &str = "/project/{project}/service/{service}/db";
    pub const DATABASE: &str = "/project/{project}/service/{service}/db/{database}";
    pub const KAFKA_ACLS: &str = "/project/{project}/service/{service}/acl";
    pub const KAFKA_ACL: &str = "/project/{project}/service/{service}/acl/{acl_id}";
    pub const INTEGRATIONS: &str = "/project/{project}/integration";
    pub const INTEGRATION: &str = "/project/{project}/integration/{integration_id}";
    pub const SERVICE_INTEGRATIONS: &str = "/project/{project}/service/{service}/integration";
    pub const VPCS: &str = "/project/{project}/vpcs";
    pub const VPC: &str = "/project/{project}/vpcs/{vpc_id}";
}
