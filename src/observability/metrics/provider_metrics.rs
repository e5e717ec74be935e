//! # Provider Metrics
//!
//! Metrics for requests to the Aiven API.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};
use std::sync::LazyLock;

static API_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("aiven_operator_api_requests_total", "Total number of Aiven API requests"),
        &["method", "status"],
    )
    .expect("Failed to create API_REQUESTS_TOTAL metric - this should never happen")
});

static API_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "aiven_operator_api_request_duration_seconds",
            "Duration of Aiven API requests in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["method"],
    )
    .expect("Failed to create API_REQUEST_DURATION metric - this should never happen")
});

/// Register provider metrics with the registry
pub(crate) fn register_provider_metrics() -> Result<()> {
    REGISTRY.register(Box::new(API_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(API_REQUEST_DURATION.clone()))?;
    Ok(())
}

/// Record one API request; `status` is the HTTP status or `error` when none arrived
pub fn record_api_request(method: &str, status: &str, duration: f64) {
    API_REQUESTS_TOTAL.with_label_values(&[method, status]).inc();
    API_REQUEST_DURATION.with_label_values(&[method]).observe(duration);
}
