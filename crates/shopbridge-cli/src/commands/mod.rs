//! CLI command implementations

pub mod discover;
pub mod init;
pub mod map;
pub mod run;
pub mod trigger;
pub mod validate;

use anyhow::{Context, Result};
use serde_json::Value;
use shopbridge_core::connectors::{ConnectorConfig, FileSource};
use shopbridge_core::{Config, Fetch, Query, Schema};

/// Load the project configuration
pub fn load_config(config_path: &str) -> Result<Config> {
    tracing::debug!("Loading configuration from {}", config_path);
    Config::load(config_path).context("Failed to load configuration")
}

/// Connector configuration with its path resolved against the project
pub fn connector(config: &Config, reference: &str) -> Result<ConnectorConfig> {
    let ConnectorConfig::File(mut file) = config
        .load_connector_config(reference)
        .with_context(|| format!("Unknown connector '{reference}'"))?;
    file.path = config.resolve_path(&file.path).display().to_string();
    Ok(ConnectorConfig::File(file))
}

/// Fetch every record a connector holds
pub async fn fetch_records(config: &Config, reference: &str) -> Result<Vec<Value>> {
    let ConnectorConfig::File(file) = connector(config, reference)?;
    FileSource::new(file)
        .fetch(&Query::new())
        .await
        .with_context(|| format!("Failed to read records from '{reference}'"))
}

/// Schema of a connector: declared if present, otherwise discovered
pub async fn connector_schema(config: &Config, reference: &str) -> Result<Schema> {
    if let Some(schema) = connector(config, reference)?.schema() {
        return Ok(schema.clone());
    }
    let records = fetch_records(config, reference).await?;
    Ok(shopbridge_core::discover_schema(
        entity_name(reference),
        &records,
        config.project.runtime.discovery_max_samples,
    ))
}

/// Default entity name for a reference: the connector key
pub fn entity_name(reference: &str) -> &str {
    reference
        .split_once('.')
        .map(|(_, key)| key)
        .unwrap_or(reference)
}
