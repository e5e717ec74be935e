//! # Status State Machine
//!
//! Condition transitions and markers written during a pass.
//!
//! Initialized becomes True once createOrUpdate succeeds and never goes back.
//! Running moves Unknown → True when a poll confirms it and True → Unknown when a
//! later poll fails or the resource is being rebuilt. Running only becomes False
//! while deletion is blocked by termination protection.

use crate::constants::PROCESSED_GENERATION_ANNOTATION;
use crate::crd::{
    find_condition, set_condition, Condition, ConditionReason, ConditionStatus, ConditionType,
    ManagedResource,
};
use kube::ResourceExt;

fn set<K: ManagedResource>(
    resource: &mut K,
    r#type: ConditionType,
    status: ConditionStatus,
    reason: ConditionReason,
    message: impl Into<String>,
) {
    set_condition(
        &mut resource.status_or_default().conditions,
        Condition::new(r#type, status, reason, message),
    );
}

fn status_of<K: ManagedResource>(resource: &K, r#type: ConditionType) -> Option<ConditionStatus> {
    find_condition(resource.conditions(), r#type).map(|c| c.status)
}

/// Preconditions are not met yet; only touches Initialized while it is not True
pub fn mark_preconditions_pending<K: ManagedResource>(resource: &mut K) {
    if status_of(resource, ConditionType::Initialized) != Some(ConditionStatus::True) {
        set(
            resource,
            ConditionType::Initialized,
            ConditionStatus::Unknown,
            ConditionReason::Preconditions,
            "Preconditions are not met",
        );
    }
}

/// createOrUpdate succeeded for the current generation
///
/// Sets Initialized=True, Running=Unknown (the remote side may be rebuilding),
/// clears the running marker and records the processed generation.
pub fn mark_created_or_updated<K: ManagedResource>(resource: &mut K, reason: ConditionReason) {
    set(
        resource,
        ConditionType::Initialized,
        ConditionStatus::True,
        reason,
        "Instance was created or updated on Aiven side",
    );
    set(
        resource,
        ConditionType::Running,
        ConditionStatus::Unknown,
        reason,
        "Instance was created or updated on Aiven side, status remains unknown",
    );
    resource.status_or_default().instance_running = false;
    mark_processed(resource);
}

/// createOrUpdate failed; Initialized turns False unless it already is True
pub fn mark_create_or_update_failed<K: ManagedResource>(resource: &mut K, message: &str) {
    if status_of(resource, ConditionType::Initialized) != Some(ConditionStatus::True) {
        set(
            resource,
            ConditionType::Initialized,
            ConditionStatus::False,
            ConditionReason::CreateOrUpdateError,
            message,
        );
    }
}

/// A poll observed the remote resource running
pub fn mark_running<K: ManagedResource>(resource: &mut K) {
    set(
        resource,
        ConditionType::Running,
        ConditionStatus::True,
        ConditionReason::CheckRunning,
        "Instance is running on Aiven side",
    );
    resource.status_or_default().instance_running = true;
}

/// A poll observed the remote resource, but not running yet
pub fn mark_not_running<K: ManagedResource>(resource: &mut K, remote_state: &str) {
    set(
        resource,
        ConditionType::Running,
        ConditionStatus::Unknown,
        ConditionReason::CheckRunning,
        format!("Instance state is {remote_state}"),
    );
    resource.status_or_default().instance_running = false;
}

/// A poll failed; Running degrades to Unknown, never to False
pub fn mark_poll_failed<K: ManagedResource>(resource: &mut K, message: &str) {
    if status_of(resource, ConditionType::Running) != Some(ConditionStatus::False) {
        set(
            resource,
            ConditionType::Running,
            ConditionStatus::Unknown,
            ConditionReason::CheckRunningError,
            message,
        );
    }
    resource.status_or_default().instance_running = false;
}

/// Deletion is blocked until termination protection is turned off
pub fn mark_deletion_blocked<K: ManagedResource>(resource: &mut K) {
    set(
        resource,
        ConditionType::Running,
        ConditionStatus::False,
        ConditionReason::TerminationProtected,
        "Deletion blocked: termination protection is on, set terminationProtection to false to delete",
    );
}

/// Generation recorded by the last successful createOrUpdate
#[must_use]
pub fn processed_generation<K: ManagedResource>(resource: &K) -> Option<i64> {
    resource
        .annotations()
        .get(PROCESSED_GENERATION_ANNOTATION)
        .and_then(|v| v.parse().ok())
}

/// Whether createOrUpdate already ran for the current generation
#[must_use]
pub fn is_generation_processed<K: ManagedResource>(resource: &K) -> bool {
    processed_generation(resource) == Some(resource.meta().generation.unwrap_or(0))
}

/// Record the current generation as processed
pub fn mark_processed<K: ManagedResource>(resource: &mut K) {
    let generation = resource.meta().generation.unwrap_or(0);
    resource.annotations_mut().insert(
        PROCESSED_GENERATION_ANNOTATION.to_string(),
        generation.to_string(),
    );
}

/// Forget the processed generation so the next pass runs createOrUpdate again
pub fn clear_processed<K: ManagedResource>(resource: &mut K) {
    resource.annotations_mut().remove(PROCESSED_GENERATION_ANNOTATION);
}
