//! Generate a transformer from two schemas

use anyhow::Result;
use shopbridge_core::{Transformer, generate_mappings};

use super::{connector_schema, entity_name, load_config};

/// Run the map command
pub async fn run(
    config_path: &str,
    source: &str,
    target: &str,
    threshold: Option<f64>,
    id: Option<&str>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let threshold = threshold.unwrap_or(config.project.runtime.auto_map_threshold);

    let source_schema = connector_schema(&config, source).await?;
    let target_schema = connector_schema(&config, target).await?;
    let mappings = generate_mappings(&source_schema, &target_schema, threshold);

    tracing::info!(
        "Mapped {} of {} target fields (threshold {})",
        mappings.len(),
        target_schema.len(),
        threshold
    );

    let id = id.map(str::to_string).unwrap_or_else(|| {
        format!("{}_to_{}", entity_name(source), entity_name(target))
    });
    let transformer = Transformer::new(id).with_mappings(mappings);
    print!("{}", serde_yaml::to_string(&transformer)?);
    Ok(())
}
