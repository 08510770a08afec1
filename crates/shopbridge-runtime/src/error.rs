//! Runtime error types

use thiserror::Error;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the pipeline runner, scheduler, and trigger dispatcher
#[derive(Error, Debug)]
pub enum Error {
    /// A job is already registered for the connection
    #[error("job already scheduled for connection '{0}'")]
    JobExists(String),

    /// No job is registered for the connection
    #[error("no job scheduled for connection '{0}'")]
    JobNotFound(String),

    /// Connection is not in the configuration store
    #[error("connection '{0}' not found")]
    ConnectionNotFound(String),

    /// Transformer is not in the configuration store
    #[error("transformer '{0}' not found")]
    TransformerNotFound(String),

    /// No fetch capability registered under the id
    #[error("no source registered as '{0}'")]
    SourceNotFound(String),

    /// No push capability registered under the id
    #[error("no target registered as '{0}'")]
    TargetNotFound(String),

    /// Execution record is not in the execution store
    #[error("execution '{0}' not found")]
    ExecutionNotFound(String),

    /// The source failed to return records
    #[error("fetch from '{source_id}' failed: {source}")]
    Fetch {
        /// Source connector id
        source_id: String,
        /// Underlying error
        source: shopbridge_core::Error,
    },

    /// The target rejected the records
    #[error("push to '{target_id}' failed: {source}")]
    Push {
        /// Target connector id
        target_id: String,
        /// Underlying error
        source: shopbridge_core::Error,
    },

    /// A record could not be transformed
    #[error("transform failed: {0}")]
    Transform(#[source] shopbridge_core::Error),

    /// The schedule string is not a valid interval
    #[error("invalid schedule '{schedule}': {message}")]
    ScheduleParse {
        /// Schedule as configured
        schedule: String,
        /// Why it was rejected
        message: String,
    },

    /// Store or configuration failure from the core crate
    #[error(transparent)]
    Core(#[from] shopbridge_core::Error),
}
