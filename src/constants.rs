//! # Constants
//!
//! Fixed tokens shared with the cluster and default values for configuration.

/// Finalizer gating physical removal until the remote resource is gone
pub const DELETION_FINALIZER: &str = "finalizers.aiven.io/delete-remote-resource";

/// Annotation holding the last generation for which createOrUpdate succeeded
pub const PROCESSED_GENERATION_ANNOTATION: &str = "controllers.aiven.io/generation-was-processed";

/// Field manager used for server-side apply and status patches
pub const FIELD_MANAGER: &str = "aiven-operator";

/// Label put on every connection secret written by the operator
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Remote service state that marks a service as running
pub const SERVICE_STATE_RUNNING: &str = "RUNNING";

/// Remote VPC state that marks a VPC as usable
pub const VPC_STATE_ACTIVE: &str = "ACTIVE";

/// Remote VPC states of a VPC on its way out
pub const VPC_STATES_GONE: [&str; 2] = ["DELETING", "DELETED"];

/// Integration type whose source must be running before the dependent service is created
pub const READ_REPLICA_INTEGRATION: &str = "read_replica";

/// Default Aiven API base URL
pub const DEFAULT_AIVEN_API_URL: &str = "https://api.aiven.io/v1";

/// Default short requeue while waiting for preconditions or readiness (seconds)
pub const DEFAULT_REQUEUE_INTERVAL_SECS: u64 = 10;

/// Default steady-state poll interval once a resource is running (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Default deadline for one reconciliation pass (seconds)
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 120;

/// Default timeout for a single Aiven API request (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default number of resources reconciled in parallel per kind
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 4;

/// Default minimum error backoff (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Default maximum error backoff (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Number of times a pass is restarted after a stale write
pub const MAX_CONFLICT_RETRIES: u32 = 3;

/// Default requeue used when the backoff state cannot be read
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Default metrics and probe port
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default server startup timeout (seconds)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default server readiness poll interval (milliseconds)
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;
