//! # Aiven Operator
//!
//! Kubernetes operator reconciling Aiven resources declared as custom resources:
//!
//! - **Services**: `PostgreSQL`, `Kafka` and `Clickhouse`, with connection secrets
//! - **Databases** inside `PostgreSQL` services
//! - **Kafka ACLs**, **service integrations** and **project VPCs**
//!
//! Every kind runs through the same reconciler: deletion finalizer, precondition
//! gating, create-or-update once per generation, then polling until running.
//!
//! Configuration is read from environment variables, see [`aiven_operator::config`].

use aiven_operator::runtime::{initialize, run_watch_loop};
use anyhow::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;
    run_watch_loop(&init).await?;
    info!("Aiven Operator shut down");
    Ok(())
}
