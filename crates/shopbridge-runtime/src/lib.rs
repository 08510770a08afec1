//! Shopbridge Runtime
//!
//! This crate runs Shopbridge connections.
//!
//! # Features
//!
//! - Pipeline runner: fetch → transform → push with an execution record
//! - Job scheduler: one cancellable loop per scheduled connection
//! - Trigger dispatcher: event-driven runs of subscribed connections
//!
//! # Usage
//!
//! ```rust,ignore
//! use shopbridge_runtime::Runtime;
//!
//! let runtime = Runtime::new(&config)?;
//! runtime.start().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod jobs;
pub mod pipeline;
pub mod scheduler;
pub mod store;
pub mod trigger;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::Runtime;
pub use error::{Error, Result};
pub use jobs::{JobSnapshot, JobStatus};
pub use pipeline::{ConnectorRegistry, PipelineRunner, RunOutcome};
pub use scheduler::Scheduler;
pub use store::{ConfigStore, Execution, ExecutionStatus, ExecutionStore};
pub use trigger::{TriggerBatch, TriggerDispatcher};
