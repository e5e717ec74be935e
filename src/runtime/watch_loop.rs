//! # Watch Loop
//!
//! One `kube_runtime` controller per resource kind, all driven by the generic
//! [`Reconciler`]. Controllers stop on SIGTERM/SIGINT.

use super::error_policy::{error_policy, log_watch_error};
use super::initialization::InitializationResult;
use crate::config::ControllerConfig;
use crate::controller::handler::{
    DatabaseHandler, Handler, KafkaAclHandler, ProjectVpcHandler, ServiceHandler, ServiceIntegrationHandler,
};
use crate::controller::reconciler::{Outcome, ReconcileError, Reconciler};
use crate::controller::store::{ObjectStore, ResourceKey};
use crate::crd::{Clickhouse, Kafka, PostgreSql};
use crate::provider::ClientFactory;
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use kube_runtime::controller::{self, Action, Controller};
use kube_runtime::watcher;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info};

/// Watcher timeout (seconds), below the client read timeout so idle watches are
/// closed by the API server first
const WATCH_TIMEOUT_SECS: u32 = 290;

type ControllerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Requeue action for a successful pass
#[must_use]
pub fn action_for(outcome: &Outcome) -> Action {
    match outcome.requeue_after {
        Some(after) => Action::requeue(after),
        None => Action::await_change(),
    }
}

async fn reconcile<H: Handler>(resource: Arc<H::Kind>, reconciler: Arc<Reconciler<H>>) -> Result<Action, ReconcileError> {
    let key = ResourceKey::from_resource(resource.as_ref());
    let outcome = reconciler.reconcile(&key).await?;
    Ok(action_for(&outcome))
}

/// Shared wiring for every controller
struct Wiring {
    client: Client,
    config: ControllerConfig,
    store: Arc<dyn ObjectStore>,
    clients: Arc<dyn ClientFactory>,
}

impl Wiring {
    fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        match self.config.watch_namespace.as_deref() {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    fn build<H: Handler>(&self, handler: H) -> ControllerFuture {
        let reconciler = Arc::new(Reconciler::new(
            handler,
            Arc::clone(&self.store),
            Arc::clone(&self.clients),
            self.config.clone(),
        ));
        let kind = reconciler.kind().to_string();
        info!("- {} controller", kind);

        let watcher_config = watcher::Config::default().timeout(WATCH_TIMEOUT_SECS);
        // Connection secrets carry a controller owner reference; removing one
        // triggers a pass that writes it again
        let secrets: Api<Secret> = self.api();

        Box::pin(
            Controller::new(self.api::<H::Kind>(), watcher_config.clone())
                .owns(secrets, watcher_config)
                .with_config(controller::Config::default().concurrency(self.config.max_concurrent_reconciles))
                .shutdown_on_signal()
                .run(reconcile::<H>, error_policy::<H>, reconciler)
                .for_each(move |result| {
                    match result {
                        Ok((object, action)) => debug!(?action, "{} {} reconciliation completed", kind, object),
                        Err(controller::Error::ReconcilerFailed(e, object)) => {
                            debug!(error = %e, "{} {} reconciliation failed", kind, object);
                        }
                        Err(e) => log_watch_error(&kind, &e.to_string()),
                    }
                    std::future::ready(())
                }),
        )
    }
}

/// Run the controllers of every kind until shutdown
///
/// # Errors
///
/// Currently never fails; controllers log their own errors and keep running.
pub async fn run_watch_loop(init: &InitializationResult) -> Result<()> {
    let wiring = Wiring {
        client: init.client.clone(),
        config: init.config.clone(),
        store: Arc::clone(&init.store),
        clients: Arc::clone(&init.clients),
    };

    info!("Starting controllers:");
    let controllers = vec![
        wiring.build(DatabaseHandler),
        wiring.build(KafkaAclHandler),
        wiring.build(ServiceIntegrationHandler),
        wiring.build(ProjectVpcHandler),
        wiring.build(ServiceHandler::<PostgreSql>::new()),
        wiring.build(ServiceHandler::<Kafka>::new()),
        wiring.build(ServiceHandler::<Clickhouse>::new()),
    ];

    futures::future::join_all(controllers).await;
    info!("All controllers stopped");
    Ok(())
}
