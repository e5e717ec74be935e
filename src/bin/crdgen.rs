//! Print the CustomResourceDefinitions of every Aiven kind as a YAML stream.
//!
//! ```bash
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use aiven_operator::crd::all_crds;
use anyhow::{Context, Result};

fn main() -> Result<()> {
    for crd in all_crds() {
        let yaml = serde_yaml::to_string(&crd).context("Failed to serialize CRD")?;
        println!("---\n{}", yaml.trim_end());
    }
    Ok(())
}
