//! Prints a drift report between two catalogs as JSON.
//!
//! ```text
//! TRINO_HOST=localhost cargo run --example drift_report -- mysql postgres shop
//! ```

use trino_drift::{DriftEngine, EngineConfig, Ident, MemorySnapshotStore, TrinoClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::from_env()?;
    let mut args = std::env::args().skip(1);
    let source = Ident::new(args.next().unwrap_or_else(|| config.catalog.clone()))?;
    let target = Ident::new(args.next().unwrap_or_else(|| "postgres".to_owned()))?;
    let schema = Ident::new(args.next().unwrap_or_else(|| config.schema.clone()))?;

    let engine = DriftEngine::new(TrinoClient::from_config(&config), MemorySnapshotStore::new());

    let report = engine.get_drift_report(&source, &target, &schema).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    let snapshot_id = engine.capture_snapshot(&source, &schema).await?;
    let drifts = engine
        .compare_with_snapshot(&snapshot_id, &source, &schema)
        .await?;
    println!("{snapshot_id}: {} column changes since capture", drifts.len());

    Ok(())
}
