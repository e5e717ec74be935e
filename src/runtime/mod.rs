//! # Runtime
//!
//! Process wiring for the operator: initialization, one watch loop per resource
//! kind, and the error policy that turns failed passes into requeues.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use error_policy::*;
pub use initialization::*;
pub use watch_loop::*;
