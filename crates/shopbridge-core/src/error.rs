//! Error types for shopbridge-core

use thiserror::Error;

/// Result type alias for shopbridge-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in shopbridge-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// A record could not be transformed
    #[error("transform error at '{field}': {message}")]
    Transform {
        /// Path of the offending field (`$` for the record itself)
        field: String,
        /// Description of the error
        message: String,
    },

    /// A mapping or function names a transformation that does not exist
    #[error("unknown function '{name}' for field '{field}'")]
    UnknownFunction {
        /// The function name as written
        name: String,
        /// Target field the function was meant to produce
        field: String,
    },

    /// A nested path could not be written
    #[error("cannot resolve path '{path}': {message}")]
    Path {
        /// The dotted path
        path: String,
        /// Why the path is blocked
        message: String,
    },

    /// Connector error
    #[error("connector '{connector}' error: {message}")]
    Connector {
        /// Name of the connector
        connector: String,
        /// Description of the error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The field path this error is attached to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Transform { field, .. } | Self::UnknownFunction { field, .. } => Some(field),
            Self::Path { path, .. } => Some(path),
            _ => None,
        }
    }
}
