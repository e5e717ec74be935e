//! # Controller Configuration
//!
//! Reconciliation cadence, deadlines and Aiven API access.

use super::{env_var_or_default, parse_kubernetes_duration};
use crate::constants::{
    DEFAULT_AIVEN_API_URL, DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_RECONCILES, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_RECONCILE_TIMEOUT_SECS, DEFAULT_REQUEUE_INTERVAL_SECS,
};
use anyhow::{Context, Result};
use std::fmt;
use std::time::Duration;
use zeroize::Zeroizing;

/// Controller configuration
#[derive(Clone)]
pub struct ControllerConfig {
    /// Aiven API base URL
    pub api_url: String,
    /// Token used when a resource has no `authSecretRef`
    pub default_token: Option<Zeroizing<String>>,
    /// Short requeue while preconditions are pending or the resource is materializing
    pub requeue_interval: Duration,
    /// Steady-state poll interval once the resource is running
    pub poll_interval: Duration,
    /// Deadline for a single reconciliation pass
    pub reconcile_timeout: Duration,
    /// Timeout for a single Aiven API request
    pub http_timeout: Duration,
    /// Resources of one kind reconciled in parallel
    pub max_concurrent_reconciles: u16,
    /// Error backoff lower bound (seconds)
    pub backoff_min_secs: u64,
    /// Error backoff upper bound (seconds)
    pub backoff_max_secs: u64,
    /// Restrict watches to one namespace
    pub watch_namespace: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_AIVEN_API_URL.to_string(),
            default_token: None,
            requeue_interval: Duration::from_secs(DEFAULT_REQUEUE_INTERVAL_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            reconcile_timeout: Duration::from_secs(DEFAULT_RECONCILE_TIMEOUT_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            max_concurrent_reconciles: DEFAULT_MAX_CONCURRENT_RECONCILES,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            watch_namespace: None,
        }
    }
}

impl fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("api_url", &self.api_url)
            .field(
                "default_token",
                &self.default_token.as_ref().map(|_| "<redacted>"),
            )
            .field("requeue_interval", &self.requeue_interval)
            .field("poll_interval", &self.poll_interval)
            .field("reconcile_timeout", &self.reconcile_timeout)
            .field("http_timeout", &self.http_timeout)
            .field("max_concurrent_reconciles", &self.max_concurrent_reconciles)
            .field("backoff_min_secs", &self.backoff_min_secs)
            .field("backoff_max_secs", &self.backoff_max_secs)
            .field("watch_namespace", &self.watch_namespace)
            .finish()
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    ///
    /// # Errors
    ///
    /// Returns an error when a duration variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let backoff_min_secs = env_var_or_default("BACKOFF_MIN_SECS", defaults.backoff_min_secs);
        Ok(Self {
            api_url: std::env::var("AIVEN_API_URL")
                .ok()
                .filter(|url| !url.trim().is_empty())
                .map_or(defaults.api_url, |url| url.trim().trim_end_matches('/').to_string()),
            default_token: std::env::var("AIVEN_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty())
                .map(Zeroizing::new),
            requeue_interval: env_duration("REQUEUE_INTERVAL", defaults.requeue_interval)?,
            poll_interval: env_duration("POLL_INTERVAL", defaults.poll_interval)?,
            reconcile_timeout: env_duration("RECONCILE_TIMEOUT", defaults.reconcile_timeout)?,
            http_timeout: env_duration("HTTP_TIMEOUT", defaults.http_timeout)?,
            max_concurrent_reconciles: env_var_or_default(
                "MAX_CONCURRENT_RECONCILES",
                defaults.max_concurrent_reconciles,
            )
            .max(1),
            backoff_min_secs,
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", defaults.backoff_max_secs)
                .max(backoff_min_secs),
            watch_namespace: std::env::var("WATCH_NAMESPACE")
                .ok()
                .filter(|ns| !ns.trim().is_empty()),
        })
    }
}

fn env_duration(key: &str, default: Duration) -> Result<Duration> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            parse_kubernetes_duration(&value).with_context(|| format!("Invalid {key}"))
        }
        _ => Ok(default),
    }
}
