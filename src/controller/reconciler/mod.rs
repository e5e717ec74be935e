//! # Reconciler
//!
//! The control loop for one resource kind. Each pass:
//!
//! 1. Loads the resource; a missing resource is gone.
//! 2. With a deletion timestamp, runs the deletion protocol ([`finalizer`]).
//!    Otherwise makes sure the deletion finalizer is stored before any remote change.
//! 3. Resolves references and checks preconditions; if not met, requeues shortly.
//! 4. Runs createOrUpdate when the processed-generation marker is stale.
//! 5. Polls with get; running resources are polled slowly, others quickly.
//!
//! Writes carry the `resourceVersion` read at the start of the pass. A conflicting
//! write restarts the pass from a fresh read.

pub mod finalizer;
pub mod references;
pub mod secret;
pub mod status;
pub mod types;

pub use types::{Outcome, Phase, ReconcileError, RetryPolicy};

use crate::config::ControllerConfig;
use crate::constants::{DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS, MAX_CONFLICT_RETRIES, PROCESSED_GENERATION_ANNOTATION};
use crate::controller::backoff::BackoffState;
use crate::controller::handler::Handler;
use crate::controller::store::{MetadataPatch, ObjectStore, ResourceKey, StoreError};
use crate::crd::ManagedResource;
use crate::observability::metrics;
use crate::provider::{ClientFactory, ControlPlane};
use kube::api::ApiResource;
use kube::core::object::HasStatus;
use kube::{Resource, ResourceExt};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument};

/// Reconciler of one resource kind
pub struct Reconciler<H: Handler> {
    handler: H,
    store: Arc<dyn ObjectStore>,
    clients: Arc<dyn ClientFactory>,
    config: ControllerConfig,
    api_resource: ApiResource,
    /// Error backoff per resource key, reset after a successful pass
    pub backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl<H: Handler + fmt::Debug> fmt::Debug for Reconciler<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("kind", &self.api_resource.kind)
            .field("handler", &self.handler)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<H: Handler> Reconciler<H> {
    #[must_use]
    pub fn new(
        handler: H,
        store: Arc<dyn ObjectStore>,
        clients: Arc<dyn ClientFactory>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            handler,
            store,
            clients,
            config,
            api_resource: ApiResource::erase::<H::Kind>(&()),
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Kind served by this reconciler
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.api_resource.kind
    }

    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Run one pass for `key` under the configured deadline
    ///
    /// # Errors
    ///
    /// Returns the error that ended the pass; [`ReconcileError::retry_policy`] tells
    /// whether retrying helps.
    pub async fn reconcile(&self, key: &ResourceKey) -> Result<Outcome, ReconcileError> {
        let span = tracing::info_span!(
            "controller.reconcile",
            resource.kind = %self.api_resource.kind,
            resource.namespace = %key.namespace,
            resource.name = %key.name,
        );

        async {
            metrics::increment_reconciliations(self.kind());
            let started = Instant::now();
            let timeout = self.config.reconcile_timeout;

            let result = match tokio::time::timeout(timeout, self.reconcile_with_retries(key)).await {
                Ok(result) => result,
                Err(_elapsed) => Err(ReconcileError::Timeout {
                    key: key.to_string(),
                    timeout,
                }),
            };

            metrics::observe_reconciliation_duration(self.kind(), started.elapsed().as_secs_f64());
            match &result {
                Ok(outcome) => {
                    self.reset_backoff(key);
                    debug!(phase = %outcome.phase, requeue_after = ?outcome.requeue_after, "Pass finished");
                }
                Err(error) => {
                    metrics::increment_reconciliation_errors(self.kind(), error.class());
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn reconcile_with_retries(&self, key: &ResourceKey) -> Result<Outcome, ReconcileError> {
        let mut attempts = 0;
        loop {
            match self.pass(key).await {
                Err(ReconcileError::Store(StoreError::Conflict(_))) => {
                    attempts += 1;
                    metrics::increment_conflict_retries(self.kind());
                    if attempts > MAX_CONFLICT_RETRIES {
                        return Err(ReconcileError::ConflictRetriesExhausted {
                            key: key.to_string(),
                            attempts,
                        });
                    }
                    debug!(attempt = attempts, "Conflicting write, restarting pass from a fresh read");
                }
                result => return result,
            }
        }
    }

    async fn pass(&self, key: &ResourceKey) -> Result<Outcome, ReconcileError> {
        let Some(object) = self.store.get(&self.api_resource, key).await? else {
            debug!("Resource is gone");
            return Ok(Outcome::done(Phase::Gone));
        };
        let mut resource = self.handler.convert(&object)?;

        if resource.meta().deletion_timestamp.is_some() {
            return self.finalize(key, resource).await;
        }

        finalizer::ensure_finalizer(self.store.as_ref(), &self.api_resource, key, &mut resource).await?;
        let avn = self
            .clients
            .client_for(&key.namespace, resource.auth_secret_ref())
            .await?;
        self.drive(key, avn.as_ref(), resource).await
    }

    /// Preconditions, createOrUpdate and poll for a live resource
    async fn drive(
        &self,
        key: &ResourceKey,
        avn: &dyn ControlPlane,
        mut resource: H::Kind,
    ) -> Result<Outcome, ReconcileError> {
        let mut observed = resource.clone();
        let references = self.handler.references(&resource);
        let Some(resolved) = references::resolve(self.store.as_ref(), &references).await? else {
            return self.wait_for_preconditions(key, &observed, resource).await;
        };
        if !self.handler.check_preconditions(avn, &resource).await? {
            return self.wait_for_preconditions(key, &observed, resource).await;
        }

        if !status::is_generation_processed(&resource) {
            info!(
                "Creating or updating remote resource for generation {}",
                resource.meta().generation.unwrap_or(0)
            );
            if let Err(error) = self.handler.create_or_update(avn, &mut resource, &resolved).await {
                warn!("❌ createOrUpdate failed: {error}");
                status::mark_create_or_update_failed(&mut resource, &error.to_string());
                self.persist(key, &observed, &mut resource).await?;
                return Err(error.into());
            }
            self.persist(key, &observed, &mut resource).await?;
            observed = resource.clone();
        }

        match self.handler.get(avn, &mut resource).await {
            Ok(secret) => {
                if let Some(secret) = secret {
                    secret::apply_connection_secret(self.store.as_ref(), &resource, secret).await?;
                }
                self.persist(key, &observed, &mut resource).await?;

                if resource.is_instance_running() {
                    metrics::increment_requeues_total("poll");
                    Ok(Outcome::requeue(Phase::Running, self.config.poll_interval))
                } else {
                    metrics::increment_requeues_total("not-running");
                    Ok(Outcome::requeue(Phase::Reconciling, self.config.requeue_interval))
                }
            }
            Err(error) => {
                if error.is_not_found() {
                    warn!("Remote resource not found, it will be recreated on the next pass");
                    status::clear_processed(&mut resource);
                }
                status::mark_poll_failed(&mut resource, &error.to_string());
                self.persist(key, &observed, &mut resource).await?;
                Err(error.into())
            }
        }
    }

    async fn wait_for_preconditions(
        &self,
        key: &ResourceKey,
        observed: &H::Kind,
        mut resource: H::Kind,
    ) -> Result<Outcome, ReconcileError> {
        status::mark_preconditions_pending(&mut resource);
        self.persist(key, observed, &mut resource).await?;
        info!(
            "⏳ Preconditions not met, retrying in {}s",
            self.config.requeue_interval.as_secs()
        );
        metrics::increment_requeues_total("preconditions");
        Ok(Outcome::requeue(Phase::PreconditionsPending, self.config.requeue_interval))
    }

    /// Store marker and status changes made since `observed` was read
    ///
    /// Unchanged status is not written, so steady-state passes cause no watch events.
    async fn persist(&self, key: &ResourceKey, observed: &H::Kind, resource: &mut H::Kind) -> Result<(), StoreError> {
        let mut version = resource.resource_version().unwrap_or_default();

        let marker = resource.annotations().get(PROCESSED_GENERATION_ANNOTATION).cloned();
        if observed.annotations().get(PROCESSED_GENERATION_ANNOTATION) != marker.as_ref() {
            let patch = MetadataPatch {
                resource_version: version,
                annotations: BTreeMap::from([(PROCESSED_GENERATION_ANNOTATION.to_string(), marker)]),
                finalizers: resource.finalizers().to_vec(),
            };
            let stored = self.store.patch_metadata(&self.api_resource, key, &patch).await?;
            version = stored.metadata.resource_version.unwrap_or_default();
        }

        if observed.status() == resource.status() {
            debug!("Skipping status update - status unchanged");
        } else {
            let status = serde_json::to_value(resource.status())?;
            let stored = self
                .store
                .patch_status(&self.api_resource, key, &version, &status)
                .await?;
            version = stored.metadata.resource_version.unwrap_or_default();
        }

        resource.meta_mut().resource_version = Some(version);
        Ok(())
    }

    /// Next error backoff for `key`, with the number of consecutive errors
    pub fn next_backoff(&self, key: &ResourceKey) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states.entry(key.to_string()).or_insert_with(|| {
                    BackoffState::new(self.config.backoff_min_secs, self.config.backoff_max_secs)
                });
                state.increment_error();
                (
                    Duration::from_secs(state.backoff.next_backoff_seconds()),
                    state.error_count,
                )
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (Duration::from_secs(DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS), 0)
            }
        }
    }

    fn reset_backoff(&self, key: &ResourceKey) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(&key.to_string());
        }
    }
}
