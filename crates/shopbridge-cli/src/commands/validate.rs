//! Validate configuration command

use anyhow::{Context, Result};

use super::load_config;

/// Run the validate command
pub async fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating configuration: {}", config_path);

    let config = load_config(config_path)?;
    tracing::info!("✓ Project: {}", config.project.name);
    tracing::info!("✓ Version: {}", config.project.version);

    config.validate().context("Invalid project")?;

    let connections = config.load_connections()?;
    let transformers = config.load_transformers()?;
    tracing::info!("✓ Transformers: {}", transformers.len());
    tracing::info!("✓ Connections: {}", connections.len());
    for connection in &connections {
        if connection.is_scheduled() {
            shopbridge_runtime::jobs::parse_schedule(&connection.schedule)
                .with_context(|| format!("Connection '{}'", connection.id))?;
        }
    }

    tracing::info!("✓ Configuration is valid");
    Ok(())
}
