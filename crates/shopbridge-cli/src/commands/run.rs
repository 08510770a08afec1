//! Run connections

use anyhow::{Context, Result};
use shopbridge_runtime::Runtime;

use super::load_config;

/// Run the run command
pub async fn run(config_path: &str, connection: Option<&str>, once: bool) -> Result<()> {
    let config = load_config(config_path)?;
    tracing::info!("Project: {}", config.project.name);

    let runtime = Runtime::new(&config).context("Failed to start runtime")?;

    if once {
        let ids = match connection {
            Some(id) => vec![id.to_string()],
            None => config
                .load_connections()?
                .into_iter()
                .filter(|c| c.active)
                .map(|c| c.id)
                .collect(),
        };

        for id in ids {
            let outcome = runtime
                .runner()
                .run(&id)
                .await
                .with_context(|| format!("Connection '{id}' failed"))?;
            tracing::info!(
                "✓ {}: fetched {}, pushed {}",
                id,
                outcome.fetched,
                outcome.pushed
            );
            println!("{}", serde_json::to_string(&outcome)?);
        }
        return Ok(());
    }

    let jobs = runtime.start().await.context("Runtime error")?;
    tracing::info!("Running {} scheduled connections (press Ctrl+C to stop)", jobs);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to install Ctrl+C handler")?;
    tracing::info!("Received shutdown signal");

    runtime.shutdown().await.context("Shutdown error")?;
    tracing::info!("Shopbridge stopped");
    Ok(())
}
