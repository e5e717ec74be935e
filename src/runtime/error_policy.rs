//! # Error Policy
//!
//! Turns failed passes into requeue actions and classifies watch stream errors.
//!
//! Errors retrying cannot fix (a wrong kind, an undecodable spec, refused deletion)
//! wait for the next change of the resource. Everything else is retried with
//! per-resource Fibonacci backoff.

use crate::controller::handler::Handler;
use crate::controller::reconciler::{ReconcileError, Reconciler, RetryPolicy};
use crate::controller::store::ResourceKey;
use crate::observability::metrics;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Requeue action for a failed pass of `resource`
pub fn error_policy<H: Handler>(
    resource: Arc<H::Kind>,
    error: &ReconcileError,
    reconciler: Arc<Reconciler<H>>,
) -> Action {
    let key = ResourceKey::from_resource(resource.as_ref());
    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.kind = reconciler.kind(),
        resource.namespace = %key.namespace,
        resource.name = %key.name,
        error.class = error.class(),
    );
    let _error_guard = error_span.enter();

    match error.retry_policy() {
        RetryPolicy::AwaitChange => {
            warn!("Reconciliation of {} cannot succeed until the resource changes: {}", key, error);
            metrics::increment_requeues_total("await-change");
            Action::await_change()
        }
        RetryPolicy::Backoff => {
            error!("Reconciliation error for {}: {}", key, error);
            let (backoff, error_count) = reconciler.next_backoff(&key);
            let next_trigger_time = chrono::Utc::now()
                + chrono::Duration::from_std(backoff).unwrap_or_else(|_| chrono::Duration::zero());

            info!(
                "🔄 Retrying with Fibonacci backoff: {}s (error count: {}, trigger source: error-backoff)",
                backoff.as_secs(),
                error_count
            );
            info!(
                "📅 Next retry scheduled: {} (in {}s, trigger source: error-backoff)",
                next_trigger_time.to_rfc3339(),
                backoff.as_secs()
            );
            metrics::increment_requeues_total("error-backoff");
            Action::requeue(backoff)
        }
    }
}

/// Kind of failure reported by a watch stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorClass {
    /// 401: RBAC revoked or token expired
    Unauthorized,
    /// 410: resource version too old, the watch relists
    Expired,
    /// 429: API server storage reinitializing
    Throttled,
    /// The watched object is gone
    NotFound,
    Other,
}

impl WatchErrorClass {
    /// Classify a rendered watch error
    #[must_use]
    pub fn classify(error: &str) -> Self {
        if error.contains("401") || error.contains("Unauthorized") || error.contains("WatchFailed") {
            Self::Unauthorized
        } else if error.contains("410") || error.contains("too old resource version") || error.contains("Expired") {
            Self::Expired
        } else if error.contains("429")
            || error.contains("storage is (re)initializing")
            || error.contains("TooManyRequests")
        {
            Self::Throttled
        } else if error.contains("ObjectNotFound") || (error.contains("404") && error.contains("not found")) {
            Self::NotFound
        } else {
            Self::Other
        }
    }
}

/// Log a watch stream error of the `kind` controller at the level its class deserves
pub fn log_watch_error(kind: &str, error: &str) {
    match WatchErrorClass::classify(error) {
        WatchErrorClass::Unauthorized => {
            error!("❌ {} watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired", kind);
            error!("   Verify the operator ServiceAccount can still list and watch {} resources", kind);
        }
        WatchErrorClass::Expired => {
            warn!(error_type = "410", "{} watch resource version expired, watch will restart", kind);
        }
        WatchErrorClass::Throttled => {
            warn!(error_type = "429", "API server storage reinitializing, {} watch is backing off", kind);
        }
        WatchErrorClass::NotFound => {
            warn!("{} resource not found (likely deleted), continuing watch...", kind);
        }
        WatchErrorClass::Other => {
            error!("{} controller stream error: {}", kind, error);
        }
    }
}
