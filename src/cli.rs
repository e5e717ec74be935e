//! # AVNCTL CLI
//!
//! Command-line companion of the Aiven Operator.
//!
//! ## Usage
//!
//! ```bash
//! # List PostgreSQL services in all namespaces
//! avnctl list pg
//!
//! # Show conditions of a database
//! avnctl status database --namespace shop --name orders
//!
//! # Force createOrUpdate on the next pass
//! avnctl reconcile kafka-acl --namespace streaming --name reader
//! ```

use aiven_operator::constants::{FIELD_MANAGER, PROCESSED_GENERATION_ANNOTATION};
use aiven_operator::controller::Phase;
use aiven_operator::crd::ManagedResource;
use aiven_operator::{Clickhouse, Database, Kafka, KafkaAcl, PostgreSql, ProjectVpc, ServiceIntegration};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::core::object::HasStatus;
use kube::{Client, Resource, ResourceExt};
use serde_json::json;

/// Aiven Operator CLI
#[derive(Parser)]
#[command(name = "avnctl")]
#[command(about = "Inspect and nudge resources managed by the Aiven Operator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace (defaults to all namespaces for list, `default` otherwise)
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List resources of a kind with their phase
    List {
        kind: Kind,
    },
    /// Show status and conditions of one resource
    Status {
        kind: Kind,
        #[arg(long)]
        name: String,
    },
    /// Clear the processed-generation marker so the next pass re-applies the spec
    Reconcile {
        kind: Kind,
        #[arg(long)]
        name: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Database,
    KafkaAcl,
    ServiceIntegration,
    ProjectVpc,
    #[value(alias = "postgresql")]
    Pg,
    Kafka,
    Clickhouse,
}

/// Run `$body` with `$k` bound to the resource type selected by `$kind`
macro_rules! with_kind {
    ($kind:expr, $k:ident => $body:expr) => {
        match $kind {
            Kind::Database => {
                type $k = Database;
                $body
            }
            Kind::KafkaAcl => {
                type $k = KafkaAcl;
                $body
            }
            Kind::ServiceIntegration => {
                type $k = ServiceIntegration;
                $body
            }
            Kind::ProjectVpc => {
                type $k = ProjectVpc;
                $body
            }
            Kind::Pg => {
                type $k = PostgreSql;
                $body
            }
            Kind::Kafka => {
                type $k = Kafka;
                $body
            }
            Kind::Clickhouse => {
                type $k = Clickhouse;
                $body
            }
        }
    };
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "avnctl=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;

    match cli.command {
        Commands::List { kind } => with_kind!(kind, K => list_command::<K>(client, cli.namespace).await),
        Commands::Status { kind, name } => {
            let ns = cli.namespace.unwrap_or_else(|| "default".to_string());
            with_kind!(kind, K => status_command::<K>(client, &ns, &name).await)
        }
        Commands::Reconcile { kind, name } => {
            let ns = cli.namespace.unwrap_or_else(|| "default".to_string());
            with_kind!(kind, K => reconcile_command::<K>(client, &ns, &name).await)
        }
    }
}

async fn list_command<K: ManagedResource>(client: Client, namespace: Option<String>) -> Result<()> {
    let kind = K::kind(&());
    let api: Api<K> = match namespace.as_deref() {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };
    let items = api
        .list(&ListParams::default())
        .await
        .with_context(|| format!("Failed to list {kind} resources"))?
        .items;

    if items.is_empty() {
        println!("No {kind} resources found.");
        return Ok(());
    }

    println!("{:<30} {:<20} {:<22} {:<12}", "NAME", "NAMESPACE", "PHASE", "STATE");
    println!("{}", "-".repeat(84));
    for item in &items {
        let state = item.status().and_then(|s| s.state.as_deref()).unwrap_or("-");
        println!(
            "{:<30} {:<20} {:<22} {:<12}",
            item.name_any(),
            item.namespace().unwrap_or_default(),
            Phase::of(item),
            state
        );
    }
    Ok(())
}

async fn status_command<K: ManagedResource>(client: Client, namespace: &str, name: &str) -> Result<()> {
    let kind = K::kind(&());
    let api: Api<K> = Api::namespaced(client, namespace);
    let resource = api
        .get(name)
        .await
        .with_context(|| format!("Failed to get {kind} '{namespace}/{name}'"))?;

    println!("{kind} '{namespace}/{name}':\n");
    println!("  Phase: {}", Phase::of(&resource));
    if let Some(generation) = resource.meta().generation {
        println!("  Generation: {generation}");
    }
    if let Some(processed) = resource.annotations().get(PROCESSED_GENERATION_ANNOTATION) {
        println!("  Processed Generation: {processed}");
    }
    println!("  Termination Protection: {}", resource.termination_protection());

    let Some(status) = resource.status() else {
        println!("\nStatus: No status available (resource may not have been reconciled yet)");
        return Ok(());
    };
    if let Some(id) = &status.id {
        println!("  Remote ID: {id}");
    }
    if let Some(state) = &status.state {
        println!("  Remote State: {state}");
    }
    println!("  Instance Running: {}", status.instance_running);

    if !status.conditions.is_empty() {
        println!("\nConditions:");
        for condition in &status.conditions {
            println!("  {:?}: {:?}", condition.r#type, condition.status);
            if let Some(reason) = &condition.reason {
                println!("    Reason: {reason}");
            }
            if let Some(message) = &condition.message {
                println!("    Message: {message}");
            }
            if let Some(time) = &condition.last_transition_time {
                println!("    Last Transition: {time}");
            }
        }
    }
    Ok(())
}

/// Removing the marker makes the resource look unprocessed; the patch itself is the
/// change event that wakes the controller
async fn reconcile_command<K: ManagedResource>(client: Client, namespace: &str, name: &str) -> Result<()> {
    let kind = K::kind(&());
    let api: Api<K> = Api::namespaced(client, namespace);
    let patch = json!({
        "metadata": {
            "annotations": { PROCESSED_GENERATION_ANNOTATION: null }
        }
    });

    api.patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
        .await
        .with_context(|| format!("Failed to trigger reconciliation for {kind} '{namespace}/{name}'"))?;

    println!("✅ Reconciliation triggered for {kind} '{namespace}/{name}'");
    println!("\nThe operator will re-apply the spec on its next pass.");
    Ok(())
}
