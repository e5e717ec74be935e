//! Per-kind adapters of the managed-service kinds.

use super::{connection_secret, ServiceAdapter};
use crate::crd::{Clickhouse, Kafka, PostgreSql, ServiceCommonSpec, UserConfig};
use crate::provider::types::ServiceInfo;
use k8s_openapi::api::core::v1::Secret;

fn param(service: &ServiceInfo, name: &str) -> Option<String> {
    service.service_uri_params.get(name).cloned()
}

impl ServiceAdapter for PostgreSql {
    const SERVICE_TYPE: &'static str = "pg";
    const CREATE_ONLY_USER_CONFIG_KEYS: &'static [&'static str] = &[
        "admin_username",
        "admin_password",
        "project_to_fork_from",
        "service_to_fork_from",
        "recovery_target_time",
    ];

    fn common_spec(&self) -> &ServiceCommonSpec {
        &self.spec.common
    }

    fn disk_space(&self) -> Option<&str> {
        self.spec.disk_space.as_deref()
    }

    fn user_config(&self) -> Option<&UserConfig> {
        self.spec.user_config.as_ref()
    }

    fn new_secret(&self, service: &ServiceInfo) -> Secret {
        connection_secret(
            self,
            [
                ("PGHOST", param(service, "host")),
                ("PGPORT", param(service, "port")),
                ("PGDATABASE", param(service, "dbname")),
                ("PGUSER", param(service, "user")),
                ("PGPASSWORD", param(service, "password")),
                ("PGSSLMODE", param(service, "sslmode")),
                ("DATABASE_URI", service.service_uri.clone()),
            ],
        )
    }
}

impl ServiceAdapter for Kafka {
    const SERVICE_TYPE: &'static str = "kafka";

    fn common_spec(&self) -> &ServiceCommonSpec {
        &self.spec.common
    }

    fn disk_space(&self) -> Option<&str> {
        self.spec.disk_space.as_deref()
    }

    fn user_config(&self) -> Option<&UserConfig> {
        self.spec.user_config.as_ref()
    }

    /// Kafka authenticates with the primary user's client certificate
    fn new_secret(&self, service: &ServiceInfo) -> Secret {
        let user = service.primary_user();
        connection_secret(
            self,
            [
                ("HOST", param(service, "host")),
                ("PORT", param(service, "port")),
                ("USERNAME", user.map(|u| u.username.clone())),
                ("PASSWORD", user.and_then(|u| u.password.clone())),
                ("ACCESS_CERT", user.and_then(|u| u.access_cert.clone())),
                ("ACCESS_KEY", user.and_then(|u| u.access_key.clone())),
            ],
        )
    }
}

impl ServiceAdapter for Clickhouse {
    const SERVICE_TYPE: &'static str = "clickhouse";

    fn common_spec(&self) -> &ServiceCommonSpec {
        &self.spec.common
    }

    fn disk_space(&self) -> Option<&str> {
        self.spec.disk_space.as_deref()
    }

    fn user_config(&self) -> Option<&UserConfig> {
        self.spec.user_config.as_ref()
    }

    fn new_secret(&self, service: &ServiceInfo) -> Secret {
        let user = service.primary_user();
        connection_secret(
            self,
            [
                ("HOST", param(service, "host")),
                ("PORT", param(service, "port")),
                ("USER", user.map(|u| u.username.clone())),
                ("PASSWORD", user.and_then(|u| u.password.clone())),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ConnInfoSecretTarget, KafkaSpec};
    use crate::provider::types::ServiceUser;
    use std::collections::BTreeMap;

    fn kafka() -> Kafka {
        let mut kafka = Kafka::new(
            "events",
            KafkaSpec {
                common: ServiceCommonSpec {
                    project: "p".to_string(),
                    plan: "business-4".to_string(),
                    conn_info_secret_target: Some(ConnInfoSecretTarget {
                        name: "events-conn".to_string(),
                        prefix: Some("KAFKA_".to_string()),
                    }),
                    ..ServiceCommonSpec::default()
                },
                disk_space: None,
                user_config: None,
            },
        );
        kafka.metadata.namespace = Some("streaming".to_string());
        kafka
    }

    #[test]
    fn test_kafka_secret_uses_certificates() {
        let service = ServiceInfo {
            service_name: "events".to_string(),
            service_type: "kafka".to_string(),
            state: "RUNNING".to_string(),
            service_uri_params: BTreeMap::from([
                ("host".to_string(), "events.aivencloud.com".to_string()),
                ("port".to_string(), "24949".to_string()),
            ]),
            users: vec![ServiceUser {
                username: "avnadmin".to_string(),
                password: Some("pw".to_string()),
                access_cert: Some("cert".to_string()),
                access_key: None,
            }],
            ..ServiceInfo::default()
        };

        let secret = kafka().new_secret(&service);
        assert_eq!(secret.metadata.name.as_deref(), Some("events-conn"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("streaming"));

        let data = secret.string_data.unwrap();
        assert_eq!(data["KAFKA_HOST"], "events.aivencloud.com");
        assert_eq!(data["KAFKA_PORT"], "24949");
        assert_eq!(data["KAFKA_USERNAME"], "avnadmin");
        assert_eq!(data["KAFKA_ACCESS_CERT"], "cert");
        assert!(!data.contains_key("KAFKA_ACCESS_KEY"));
    }

    #[test]
    fn test_service_types() {
        assert_eq!(PostgreSql::SERVICE_TYPE, "pg");
        assert_eq!(Kafka::SERVICE_TYPE, "kafka");
        assert_eq!(Clickhouse::SERVICE_TYPE, "clickhouse");
    }
}
