//! # Aiven Operator
//!
//! Kubernetes operator that drives Aiven managed resources (services, databases,
//! Kafka ACLs, service integrations and project VPCs) towards their declared state.
//!
//! The reconciliation engine is generic: every resource kind implements the
//! [`controller::handler::Handler`] capability set and the
//! [`controller::reconciler::Reconciler`] runs the same condition state machine and
//! finalizer protocol for all of them.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod provider;
pub mod runtime;

pub use crd::{
    Clickhouse, Condition, ConditionStatus, ConditionType, Database, Kafka, KafkaAcl, PostgreSql,
    ProjectVpc, ResourceStatus, ServiceIntegration,
};
