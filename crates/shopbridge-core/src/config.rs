//! Configuration parsing and validation
//!
//! This module handles loading and validating Shopbridge project files.
//!
//! # Configuration Files
//!
//! - `shopbridge.yaml` - Project root configuration
//! - `connectors/*.yaml` - Named data sources, referenced as `<file>.<key>`
//! - `transformers/*.yaml` - One transformer per file
//! - `connections/*.yaml` - One connection per file

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::connection::Connection;
use crate::connectors::ConnectorConfig;
use crate::error::{Error, Result};
use crate::mapping::DEFAULT_THRESHOLD;
use crate::transforms::Transformer;

/// Name of the project root file
pub const PROJECT_FILE: &str = "shopbridge.yaml";

/// Root project configuration from `shopbridge.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Runtime configuration
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Minimum similarity for auto-generated mappings
    #[serde(default = "default_threshold")]
    pub auto_map_threshold: f64,

    /// Number of records inspected by schema discovery
    #[serde(default = "default_max_samples")]
    pub discovery_max_samples: usize,

    /// Number of recent errors each scheduled job keeps
    #[serde(default = "default_error_history")]
    pub error_history: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            auto_map_threshold: default_threshold(),
            discovery_max_samples: default_max_samples(),
            error_history: default_error_history(),
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_max_samples() -> usize {
    10
}

fn default_error_history() -> usize {
    10
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the project directory or shopbridge.yaml file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./my-project")?;
    /// println!("Project: {}", config.project.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(PROJECT_FILE), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;

        Ok(Self { project, base_path })
    }

    /// Load all connection definitions from `connections/*.yaml`
    pub fn load_connections(&self) -> Result<Vec<Connection>> {
        self.load_dir("connections")
    }

    /// Load all transformer definitions from `transformers/*.yaml`
    pub fn load_transformers(&self) -> Result<Vec<Transformer>> {
        self.load_dir("transformers")
    }

    fn load_dir<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let dir = self.base_path.join(name);
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut entries: Vec<_> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .collect();
        entries.sort_by_key(|e| e.path());

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let contents = std::fs::read_to_string(entry.path())?;
            items.push(serde_yaml::from_str(&contents)?);
        }
        Ok(items)
    }

    /// Resolve a dotted connector reference like `"shop.products"` to a `ConnectorConfig`.
    ///
    /// The reference format is `"<filename>.<key>"` which maps to
    /// `connectors/<filename>.yaml` → key `<key>`.
    pub fn load_connector_config(&self, reference: &str) -> Result<ConnectorConfig> {
        let (file, key) = reference
            .split_once('.')
            .ok_or_else(|| Error::ConfigInvalid {
                message: format!(
                    "connector reference '{}' must be in 'file.key' format",
                    reference
                ),
            })?;

        let path = self
            .base_path
            .join("connectors")
            .join(format!("{}.yaml", file));
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&path)?;
        let doc: serde_yaml::Value = serde_yaml::from_str(&contents)?;

        let connector_value = doc.get(key).ok_or_else(|| Error::ConfigInvalid {
            message: format!("key '{}' not found in {}", key, path.display()),
        })?;

        let config: ConnectorConfig = serde_yaml::from_value(connector_value.clone())?;
        Ok(config)
    }

    /// Resolve a path from a project file against the project directory
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// Check that every connection resolves: unique ids, known connectors,
    /// known transformers with known function names.
    pub fn validate(&self) -> Result<()> {
        let transformers = self.load_transformers()?;
        let mut transformer_ids = HashSet::new();
        for transformer in &transformers {
            if !transformer_ids.insert(transformer.id.as_str()) {
                return Err(Error::ConfigInvalid {
                    message: format!("duplicate transformer id '{}'", transformer.id),
                });
            }
            transformer.validate()?;
        }

        let mut connection_ids = HashSet::new();
        for connection in self.load_connections()? {
            if !connection_ids.insert(connection.id.clone()) {
                return Err(Error::ConfigInvalid {
                    message: format!("duplicate connection id '{}'", connection.id),
                });
            }
            if !transformer_ids.contains(connection.transformer.as_str()) {
                return Err(Error::ConfigInvalid {
                    message: format!(
                        "connection '{}' uses unknown transformer '{}'",
                        connection.id, connection.transformer
                    ),
                });
            }
            self.load_connector_config(&connection.source)?;
            self.load_connector_config(&connection.target)?;
        }
        Ok(())
    }
}
