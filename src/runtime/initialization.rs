//! # Initialization
//!
//! Operator start-up: rustls and tracing setup, metrics registration, the probe
//! server, the Kubernetes client and the Aiven client factory.

use crate::config::{load_config, ControllerConfig, ServerConfig};
use crate::controller::server::{start_server, ServerState};
use crate::controller::store::{KubeStore, ObjectStore};
use crate::crd::{Clickhouse, Database, Kafka, KafkaAcl, ManagedResource, PostgreSql, ProjectVpc, ServiceIntegration};
use crate::observability;
use crate::provider::aiven::build_http_client;
use crate::provider::{ClientFactory, TokenClientFactory};
use anyhow::{anyhow, Result};
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Everything the watch loops need
pub struct InitializationResult {
    pub client: Client,
    pub config: ControllerConfig,
    pub store: Arc<dyn ObjectStore>,
    pub clients: Arc<dyn ClientFactory>,
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("config", &self.config)
            .field("server_state", &self.server_state)
            .finish_non_exhaustive()
    }
}

/// Initialize the operator runtime
///
/// # Errors
///
/// Returns an error when configuration is malformed, the probe server does not come
/// up, or no Kubernetes client can be built.
pub async fn initialize() -> Result<InitializationResult> {
    // rustls 0.23 needs a process-wide provider before any TLS connection
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aiven_operator=info".into()),
        )
        .init();

    info!("Starting Aiven Operator");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    let (config, server_config) = load_config()?;
    info!("Configuration: {:?}", config);

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::new());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {:#}", e);
        }
    });
    wait_for_server_ready(&server_config, &server_state, &server_handle).await?;

    let client = Client::try_default().await?;
    let store: Arc<dyn ObjectStore> = Arc::new(KubeStore::new(client.clone()));
    let http = build_http_client(config.http_timeout)?;
    let clients: Arc<dyn ClientFactory> = Arc::new(TokenClientFactory::new(
        Arc::clone(&store),
        http,
        config.api_url.clone(),
        config.default_token.clone(),
    ));

    summarize_existing_resources(&client, config.watch_namespace.as_deref()).await;

    info!("Operator initialized, starting watch loops...");
    Ok(InitializationResult {
        client,
        config,
        store,
        clients,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_config: &ServerConfig,
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(server_config.startup_timeout_secs);
    let poll_interval = Duration::from_millis(server_config.poll_interval_ms);
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow!("HTTP server failed to start"));
        }
        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }
        if start_time.elapsed() > startup_timeout {
            return Err(anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Log how many resources of every kind exist, per namespace
///
/// A kind that cannot be listed is usually a missing CRD; the watch for it keeps
/// retrying, so this only warns.
async fn summarize_existing_resources(client: &Client, namespace: Option<&str>) {
    info!("Aiven Operator - Startup Resource Summary");
    summarize::<Database>(client, namespace).await;
    summarize::<KafkaAcl>(client, namespace).await;
    summarize::<ServiceIntegration>(client, namespace).await;
    summarize::<ProjectVpc>(client, namespace).await;
    summarize::<PostgreSql>(client, namespace).await;
    summarize::<Kafka>(client, namespace).await;
    summarize::<Clickhouse>(client, namespace).await;
}

async fn summarize<K: ManagedResource>(client: &Client, namespace: Option<&str>) {
    let kind = K::kind(&());
    let api: Api<K> = match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    match api.list(&ListParams::default()).await {
        Ok(list) => {
            let mut by_namespace: BTreeMap<String, usize> = BTreeMap::new();
            for item in &list.items {
                *by_namespace
                    .entry(item.namespace().unwrap_or_else(|| "default".to_string()))
                    .or_default() += 1;
            }
            info!(
                "Resource Kind: {} - {} resources in {} namespaces",
                kind,
                list.items.len(),
                by_namespace.len()
            );
            for (ns, count) in &by_namespace {
                info!("  Namespace: {} ({})", ns, count);
            }
        }
        Err(e) => {
            error!("{} CRD is not queryable; {}. Is the CRD installed?", kind, e);
            error!("Installation: crdgen | kubectl apply -f -");
            warn!(error = %e, "CRD queryability check failed");
        }
    }
}
