//! Aiven REST client against a local mock server.

pub mod client;
pub mod mock_server;
pub mod reconcile;
