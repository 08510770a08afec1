//! Configuration and execution stores
//!
//! The runtime reads connections and transformers through [`ConfigStore`] and
//! records every pipeline run through [`ExecutionStore`]. Database-backed
//! stores live outside this crate; the in-memory stores here back the CLI and
//! the tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use shopbridge_core::{Config, Connection, Transformer};

use crate::error::{Error, Result};

/// Terminal and in-flight states of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Run started, not finished
    InProgress,
    /// Run finished and pushed (or had nothing to push)
    Success,
    /// Run aborted by a fetch, transform, or push failure
    Failed,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::InProgress => "in_progress",
            Self::Success => "success",
            Self::Failed => "failed",
        })
    }
}

/// Audit record of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Execution identifier
    pub id: String,

    /// Connection that ran
    pub connection_id: String,

    /// Current status
    pub status: ExecutionStatus,

    /// When the run started
    pub start_time: DateTime<Utc>,

    /// When the run finished
    pub end_time: Option<DateTime<Utc>>,

    /// Records as fetched
    pub source_data: Vec<Value>,

    /// Records as pushed
    pub target_data: Vec<Value>,

    /// Error text for failed runs
    pub error: Option<String>,
}

impl Execution {
    /// Start a new in-progress execution
    pub fn start(connection_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            connection_id: connection_id.into(),
            status: ExecutionStatus::InProgress,
            start_time: Utc::now(),
            end_time: None,
            source_data: Vec::new(),
            target_data: Vec::new(),
            error: None,
        }
    }

    /// Mark the execution successful
    pub fn succeed(&mut self) {
        self.status = ExecutionStatus::Success;
        self.end_time = Some(Utc::now());
    }

    /// Mark the execution failed with an error message
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = ExecutionStatus::Failed;
        self.error = Some(error.into());
        self.end_time = Some(Utc::now());
    }
}

/// Read access to persisted connection configuration
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Look up a connection
    async fn connection(&self, id: &str) -> Result<Option<Connection>>;

    /// All known connections
    async fn connections(&self) -> Result<Vec<Connection>>;

    /// Look up a transformer
    async fn transformer(&self, id: &str) -> Result<Option<Transformer>>;
}

/// Append and update access to execution records
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Persist a new execution
    async fn create(&self, execution: &Execution) -> Result<()>;

    /// Replace a stored execution by id
    async fn update(&self, execution: &Execution) -> Result<()>;

    /// Look up an execution
    async fn get(&self, id: &str) -> Result<Option<Execution>>;

    /// Executions of one connection, oldest first
    async fn list(&self, connection_id: &str) -> Result<Vec<Execution>>;
}

/// Configuration held in memory
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    connections: RwLock<Vec<Connection>>,
    transformers: RwLock<HashMap<String, Transformer>>,
}

impl MemoryConfigStore {
    /// Create a store from connections and transformers
    pub fn new(
        connections: impl IntoIterator<Item = Connection>,
        transformers: impl IntoIterator<Item = Transformer>,
    ) -> Self {
        Self {
            connections: RwLock::new(connections.into_iter().collect()),
            transformers: RwLock::new(
                transformers
                    .into_iter()
                    .map(|t| (t.id.clone(), t))
                    .collect(),
            ),
        }
    }

    /// Create a store from a project's connection and transformer files
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.load_connections()?,
            config.load_transformers()?,
        ))
    }

    /// Insert or replace a connection
    pub async fn upsert_connection(&self, connection: Connection) {
        let mut connections = self.connections.write().await;
        match connections.iter_mut().find(|c| c.id == connection.id) {
            Some(existing) => *existing = connection,
            None => connections.push(connection),
        }
    }

    /// Insert or replace a transformer
    pub async fn upsert_transformer(&self, transformer: Transformer) {
        self.transformers
            .write()
            .await
            .insert(transformer.id.clone(), transformer);
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn connection(&self, id: &str) -> Result<Option<Connection>> {
        Ok(self
            .connections
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn connections(&self) -> Result<Vec<Connection>> {
        Ok(self.connections.read().await.clone())
    }

    async fn transformer(&self, id: &str) -> Result<Option<Transformer>> {
        Ok(self.transformers.read().await.get(id).cloned())
    }
}

/// Executions held in memory
#[derive(Debug, Default)]
pub struct MemoryExecutionStore {
    executions: RwLock<Vec<Execution>>,
}

impl MemoryExecutionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored execution, oldest first
    pub async fn all(&self) -> Vec<Execution> {
        self.executions.read().await.clone()
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn create(&self, execution: &Execution) -> Result<()> {
        self.executions.write().await.push(execution.clone());
        Ok(())
    }

    async fn update(&self, execution: &Execution) -> Result<()> {
        let mut executions = self.executions.write().await;
        let stored = executions
            .iter_mut()
            .find(|e| e.id == execution.id)
            .ok_or_else(|| Error::ExecutionNotFound(execution.id.clone()))?;
        *stored = execution.clone();
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Execution>> {
        Ok(self
            .executions
            .read()
            .await
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn list(&self, connection_id: &str) -> Result<Vec<Execution>> {
        Ok(self
            .executions
            .read()
            .await
            .iter()
            .filter(|e| e.connection_id == connection_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_config_store_lookup_and_upsert() {
        let store = MemoryConfigStore::new(
            [Connection::new("sync", "shop.products", "market.listings", "copy")],
            [Transformer::new("copy")],
        );

        assert!(store.connection("sync").await.unwrap().is_some());
        assert!(store.connection("other").await.unwrap().is_none());
        assert!(store.transformer("copy").await.unwrap().is_some());

        store
            .upsert_connection(
                Connection::new("sync", "shop.products", "market.listings", "copy")
                    .with_active(false),
            )
            .await;
        let connections = store.connections().await.unwrap();
        assert_eq!(connections.len(), 1);
        assert!(!connections[0].active);
    }

    #[tokio::test]
    async fn test_execution_lifecycle() {
        let store = MemoryExecutionStore::new();
        let mut execution = Execution::start("sync");
        store.create(&execution).await.unwrap();
        assert_eq!(
            store.get(&execution.id).await.unwrap().unwrap().status,
            ExecutionStatus::InProgress
        );

        execution.source_data = vec![json!({"a": 1})];
        execution.fail("fetch failed");
        store.update(&execution).await.unwrap();

        let stored = store.get(&execution.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ExecutionStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some("fetch failed"));
        assert!(stored.end_time.is_some());
        assert_eq!(store.list("sync").await.unwrap().len(), 1);
        assert!(store.list("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_execution_fails() {
        let store = MemoryExecutionStore::new();
        let err = store.update(&Execution::start("sync")).await.unwrap_err();
        assert!(matches!(err, Error::ExecutionNotFound(_)));
    }

    #[test]
    fn test_execution_status_serialization() {
        let text = serde_json::to_string(&ExecutionStatus::InProgress).unwrap();
        assert_eq!(text, "\"in_progress\"");
        assert_eq!(ExecutionStatus::Failed.to_string(), "failed");
    }
}
