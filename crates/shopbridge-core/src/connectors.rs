//! Connector capabilities and implementations
//!
//! A data source exposes two capabilities: [`Fetch`] pulls a batch of records
//! for a query and [`Push`] writes a batch of records. Marketplace and webshop
//! clients implement these traits outside this crate; the file connectors here
//! cover local development and testing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::path::get_path;
use crate::schema::Schema;

/// Query passed to [`Fetch::fetch`]
pub type Query = Map<String, Value>;

/// Capability to read records from a data source
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch the records matching `query`
    async fn fetch(&self, query: &Query) -> Result<Vec<Value>>;
}

/// Capability to write records to a data source
#[async_trait]
pub trait Push: Send + Sync {
    /// Push a batch of records
    async fn push(&self, records: &[Value]) -> Result<()>;

    /// Declared shape of the records this target accepts, if known
    fn schema(&self) -> Option<&Schema> {
        None
    }
}

/// Connector configuration from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectorConfig {
    /// File connector for local development/testing
    File(FileConnectorConfig),
}

impl ConnectorConfig {
    /// Declared target schema, if any
    pub fn schema(&self) -> Option<&Schema> {
        match self {
            Self::File(f) => f.schema.as_ref(),
        }
    }
}

/// File layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// One JSON object per line
    #[default]
    Jsonl,
    /// A single JSON array (or object)
    Json,
}

/// File connector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConnectorConfig {
    /// File path
    pub path: String,

    /// Format: json or jsonl
    #[serde(default)]
    pub format: FileFormat,

    /// Shape of the records this file accepts when used as a target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

impl FileConnectorConfig {
    /// JSONL file at `path`
    pub fn jsonl(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format: FileFormat::Jsonl,
            schema: None,
        }
    }
}

// ============================================================================
// File Connector Implementation (for local dev/testing)
// ============================================================================

/// Reads records from a local file.
///
/// Query keys `limit` and `offset` page through the records; every other key
/// is an equality filter on the record path of the same name.
pub struct FileSource {
    config: FileConnectorConfig,
}

impl FileSource {
    /// Create a new file source
    pub fn new(config: FileConnectorConfig) -> Self {
        Self { config }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Connector {
            connector: self.config.path.clone(),
            message: message.into(),
        }
    }

    fn parse(&self, contents: &str) -> Result<Vec<Value>> {
        match self.config.format {
            FileFormat::Jsonl => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| serde_json::from_str(line).map_err(Error::from))
                .collect(),
            FileFormat::Json => match serde_json::from_str::<Value>(contents)? {
                Value::Array(items) => Ok(items),
                Value::Null => Ok(Vec::new()),
                single @ Value::Object(_) => Ok(vec![single]),
                other => Err(self.error(format!(
                    "expected an array of records, found {}",
                    crate::path::kind(&other)
                ))),
            },
        }
    }
}

#[async_trait]
impl Fetch for FileSource {
    async fn fetch(&self, query: &Query) -> Result<Vec<Value>> {
        let contents = tokio::fs::read_to_string(&self.config.path)
            .await
            .map_err(|e| self.error(format!("cannot read file: {e}")))?;
        let records = self.parse(&contents)?;

        let offset = query_usize(query, "offset").unwrap_or(0);
        let limit = query_usize(query, "limit").unwrap_or(usize::MAX);
        let filters: Vec<(&String, &Value)> = query
            .iter()
            .filter(|(key, _)| key.as_str() != "limit" && key.as_str() != "offset")
            .collect();

        let selected: Vec<Value> = records
            .into_iter()
            .filter(|record| {
                filters
                    .iter()
                    .all(|(path, expected)| get_path(record, path) == Some(*expected))
            })
            .skip(offset)
            .take(limit)
            .collect();

        tracing::debug!(path = %self.config.path, count = selected.len(), "fetched records");
        Ok(selected)
    }
}

fn query_usize(query: &Query, key: &str) -> Option<usize> {
    match query.get(key)? {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Writes records to a local file.
///
/// `jsonl` appends one line per record; `json` replaces the file with the
/// latest batch.
pub struct FileSink {
    config: FileConnectorConfig,
    lock: Mutex<()>,
}

impl FileSink {
    /// Create a new file sink
    pub fn new(config: FileConnectorConfig) -> Self {
        Self {
            config,
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl Push for FileSink {
    async fn push(&self, records: &[Value]) -> Result<()> {
        let _guard = self.lock.lock().await;

        if let Some(parent) = Path::new(&self.config.path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        match self.config.format {
            FileFormat::Jsonl => {
                let mut buffer = String::new();
                for record in records {
                    buffer.push_str(&serde_json::to_string(record)?);
                    buffer.push('\n');
                }
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.config.path)
                    .await?;
                file.write_all(buffer.as_bytes()).await?;
                file.flush().await?;
            }
            FileFormat::Json => {
                let body = serde_json::to_string_pretty(records)?;
                tokio::fs::write(&self.config.path, body).await?;
            }
        }

        tracing::debug!(path = %self.config.path, count = records.len(), "pushed records");
        Ok(())
    }

    fn schema(&self) -> Option<&Schema> {
        self.config.schema.as_ref()
    }
}
