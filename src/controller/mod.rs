//! # Controller
//!
//! The generic reconciliation engine and its seams:
//!
//! - [`handler`]: per-kind lifecycle operations against the Aiven API
//! - [`reconciler`]: condition state machine, finalizer protocol, secret publication
//! - [`store`]: optimistic-concurrency access to the Kubernetes API
//! - [`backoff`]: per-resource error backoff
//! - [`server`]: metrics and probe endpoints

pub mod backoff;
pub mod handler;
pub mod reconciler;
pub mod server;
pub mod store;

pub use reconciler::{Outcome, Phase, Reconciler};
pub use store::ResourceKey;
