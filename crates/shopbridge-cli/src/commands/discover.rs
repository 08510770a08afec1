//! Discover a source schema

use anyhow::Result;
use shopbridge_core::discover_schema;

use super::{entity_name, fetch_records, load_config};

/// Run the discover command
pub async fn run(
    config_path: &str,
    source: &str,
    entity: Option<&str>,
    max_samples: Option<usize>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let records = fetch_records(&config, source).await?;
    let max_samples = max_samples.unwrap_or(config.project.runtime.discovery_max_samples);

    let schema = discover_schema(
        entity.unwrap_or_else(|| entity_name(source)),
        &records,
        max_samples,
    );
    tracing::info!("Discovered {} fields from {}", schema.len(), source);

    print!("{}", serde_yaml::to_string(&schema)?);
    Ok(())
}
