//! Runtime assembly

use std::sync::Arc;

use shopbridge_core::Config;

use crate::error::Result;
use crate::pipeline::{ConnectorRegistry, PipelineRunner};
use crate::scheduler::Scheduler;
use crate::store::{MemoryConfigStore, MemoryExecutionStore};
use crate::trigger::TriggerDispatcher;

/// Runtime for one project: stores, connectors, scheduler, and triggers
pub struct Runtime {
    configs: Arc<MemoryConfigStore>,
    executions: Arc<MemoryExecutionStore>,
    runner: PipelineRunner,
    scheduler: Scheduler,
    triggers: TriggerDispatcher,
}

impl Runtime {
    /// Build a runtime from a validated project
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let connections = config.load_connections()?;
        let configs = Arc::new(MemoryConfigStore::from_config(config)?);
        let executions = Arc::new(MemoryExecutionStore::new());
        let connectors = Arc::new(ConnectorRegistry::from_config(config)?);

        let runner = PipelineRunner::new(configs.clone(), executions.clone(), connectors);
        let scheduler = Scheduler::new(runner.clone())
            .with_error_history(config.project.runtime.error_history);
        let triggers = TriggerDispatcher::from_connections(runner.clone(), configs.clone(), &connections);

        Ok(Self {
            configs,
            executions,
            runner,
            scheduler,
            triggers,
        })
    }

    /// Schedule every active connection that has a schedule
    pub async fn start(&self) -> Result<usize> {
        tracing::info!("Starting Shopbridge runtime");
        let jobs = self
            .scheduler
            .initialize_from_persistence(self.configs.as_ref())
            .await?;
        tracing::info!(jobs, "Runtime started successfully");
        Ok(jobs)
    }

    /// Cancel all jobs and wait for in-flight runs to finish
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down Shopbridge runtime");
        self.scheduler.shutdown().await;
        tracing::info!("Runtime shutdown complete");
        Ok(())
    }

    /// Pipeline runner for manual runs
    pub fn runner(&self) -> &PipelineRunner {
        &self.runner
    }

    /// Job scheduler
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Event trigger dispatcher
    pub fn triggers(&self) -> &TriggerDispatcher {
        &self.triggers
    }

    /// Execution records of this process
    pub fn executions(&self) -> &MemoryExecutionStore {
        &self.executions
    }
}
