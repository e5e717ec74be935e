//! # Conditions
//!
//! Typed readiness signals kept in every resource status.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition types understood by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum ConditionType {
    /// Remote resource was created or updated for the current generation
    Initialized,
    /// Remote resource is observed running
    Running,
}

/// Condition status values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// Short machine-readable reasons attached to conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionReason {
    Created,
    Updated,
    Preconditions,
    CheckRunning,
    CreateOrUpdateError,
    CheckRunningError,
    TerminationProtected,
}

impl ConditionReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::Preconditions => "Preconditions",
            Self::CheckRunning => "CheckRunning",
            Self::CreateOrUpdateError => "CreateOrUpdateError",
            Self::CheckRunningError => "CheckRunningError",
            Self::TerminationProtected => "TerminationProtected",
        }
    }
}

impl fmt::Display for ConditionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition represents one observation of a resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: ConditionType,
    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,
    /// Last time the status changed (RFC3339)
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
}

impl Condition {
    #[must_use]
    pub fn new(
        r#type: ConditionType,
        status: ConditionStatus,
        reason: ConditionReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            r#type,
            status,
            last_transition_time: None,
            reason: Some(reason.as_str().to_string()),
            message: Some(message.into()),
        }
    }
}

/// Find the condition of the given type
#[must_use]
pub fn find_condition(conditions: &[Condition], r#type: ConditionType) -> Option<&Condition> {
    conditions.iter().find(|c| c.r#type == r#type)
}

/// True when the condition of the given type exists with status `True`
#[must_use]
pub fn is_condition_true(conditions: &[Condition], r#type: ConditionType) -> bool {
    find_condition(conditions, r#type).is_some_and(|c| c.status == ConditionStatus::True)
}

/// Replace the condition of the same type, or append it
///
/// `lastTransitionTime` moves only when the status changes.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    set_condition_at(conditions, condition, Utc::now());
}

/// [`set_condition`] with an explicit clock
pub fn set_condition_at(conditions: &mut Vec<Condition>, mut condition: Condition, now: DateTime<Utc>) {
    match conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        Some(existing) => {
            condition.last_transition_time = if existing.status == condition.status {
                existing
                    .last_transition_time
                    .clone()
                    .or_else(|| Some(now.to_rfc3339()))
            } else {
                Some(now.to_rfc3339())
            };
            *existing = condition;
        }
        None => {
            condition.last_transition_time = Some(now.to_rfc3339());
            conditions.push(condition);
        }
    }
}
