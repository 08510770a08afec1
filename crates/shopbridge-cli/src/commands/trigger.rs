//! Fire an event

use anyhow::{Context, Result};
use serde_json::Value;
use shopbridge_runtime::Runtime;

use super::load_config;

/// Run the trigger command
pub async fn run(
    config_path: &str,
    source: &str,
    event: &str,
    payload: Option<&str>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let payload: Value = match payload {
        Some(text) => serde_json::from_str(text).context("Payload is not valid JSON")?,
        None => Value::Null,
    };

    let runtime = Runtime::new(&config).context("Failed to start runtime")?;
    let batch = runtime.triggers().handle_trigger(source, event, payload).await?;
    if batch.is_empty() {
        tracing::info!("No active connections subscribed to {}/{}", source, event);
        return Ok(());
    }

    let mut failed = 0;
    for (id, result) in batch.wait().await {
        match result {
            Ok(outcome) => {
                tracing::info!("✓ {}: pushed {}", id, outcome.pushed);
                println!("{}", serde_json::to_string(&outcome)?);
            }
            Err(e) => {
                tracing::error!("✗ {}: {}", id, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} triggered runs failed");
    }
    Ok(())
}
