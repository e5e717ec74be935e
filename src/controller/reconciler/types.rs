//! # Reconciler Types
//!
//! Pass outcomes, lifecycle phases and reconciliation errors with their retry policy.

use crate::controller::handler::HandlerError;
use crate::controller::store::StoreError;
use crate::crd::{find_condition, ConditionStatus, ConditionType, ManagedResource};
use crate::provider::CredentialsError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Lifecycle phase of a resource as seen by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Never processed
    Discovered,
    /// Waiting for prerequisites
    PreconditionsPending,
    /// Remote resource requested, not confirmed running yet
    Reconciling,
    /// Remote resource confirmed running
    Running,
    /// Deletion requested, remote deletion not finished
    DeletionPending,
    /// Remote resource deleted and finalizer released, or the object is gone
    Gone,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discovered => "Discovered",
            Self::PreconditionsPending => "PreconditionsPending",
            Self::Reconciling => "Reconciling",
            Self::Running => "Running",
            Self::DeletionPending => "DeletionPending",
            Self::Gone => "Gone",
        }
    }

    /// Phase implied by a stored resource
    #[must_use]
    pub fn of<K: ManagedResource>(resource: &K) -> Self {
        if resource.meta().deletion_timestamp.is_some() {
            return Self::DeletionPending;
        }
        if resource.is_instance_running() {
            return Self::Running;
        }
        match find_condition(resource.conditions(), ConditionType::Initialized) {
            Some(c) if c.status == ConditionStatus::True => Self::Reconciling,
            Some(_) => Self::PreconditionsPending,
            None => Self::Discovered,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub phase: Phase,
    /// `None` means wait for the next change event
    pub requeue_after: Option<Duration>,
}

impl Outcome {
    #[must_use]
    pub fn requeue(phase: Phase, after: Duration) -> Self {
        Self {
            phase,
            requeue_after: Some(after),
        }
    }

    #[must_use]
    pub fn done(phase: Phase) -> Self {
        Self {
            phase,
            requeue_after: None,
        }
    }
}

/// How a failed pass is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry with per-resource Fibonacci backoff
    Backoff,
    /// Do not retry until the resource changes
    AwaitChange,
}

/// Errors of a reconciliation pass
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error("reconciliation of {key} timed out after {timeout:?}")]
    Timeout { key: String, timeout: Duration },

    #[error("giving up on {key} after {attempts} conflicting writes")]
    ConflictRetriesExhausted { key: String, attempts: u32 },
}

impl ReconcileError {
    /// Whether retrying without a change can help
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Handler(
                HandlerError::TypeMismatch { .. }
                | HandlerError::Decode { .. }
                | HandlerError::TerminationProtected
                | HandlerError::Invalid(_),
            ) => RetryPolicy::AwaitChange,
            _ => RetryPolicy::Backoff,
        }
    }

    /// Short label for metrics and logs
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self {
            Self::Handler(HandlerError::TypeMismatch { .. }) => "type_mismatch",
            Self::Handler(HandlerError::Decode { .. }) => "decode",
            Self::Handler(HandlerError::TerminationProtected) => "termination_protected",
            Self::Handler(HandlerError::Invalid(_)) => "invalid",
            Self::Handler(HandlerError::Remote(e)) => e.as_str(),
            Self::Store(_) => "store",
            Self::Credentials(_) => "credentials",
            Self::Timeout { .. } => "timeout",
            Self::ConflictRetriesExhausted { .. } => "conflict",
        }
    }
}
