//! Connection definitions
//!
//! A connection wires one source connector to one target connector through a
//! transformer. It runs on a schedule, on events, or on demand.

use serde::{Deserialize, Serialize};

use crate::connectors::Query;

/// A connection definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Connection identifier (must be unique within project)
    pub id: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Source connector reference
    pub source: String,

    /// Target connector reference
    pub target: String,

    /// Transformer identifier
    pub transformer: String,

    /// Query handed to the source on every fetch
    #[serde(default)]
    pub query: Query,

    /// Repeat interval such as `15m` or `@hourly`; empty means unscheduled
    #[serde(default)]
    pub schedule: String,

    /// Inactive connections are never scheduled or triggered
    #[serde(default = "default_active")]
    pub active: bool,

    /// Events that run this connection
    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,
}

fn default_active() -> bool {
    true
}

/// Event subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Source that emits the event
    pub source: String,

    /// Event name, e.g. `order.created`
    pub event: String,
}

impl Connection {
    /// Create an active, unscheduled connection
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        transformer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: None,
            source: source.into(),
            target: target.into(),
            transformer: transformer.into(),
            query: Query::new(),
            schedule: String::new(),
            active: true,
            triggers: Vec::new(),
        }
    }

    /// Set the schedule
    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = schedule.into();
        self
    }

    /// Set the query
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// Mark active or inactive
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Whether the scheduler should own a job for this connection
    pub fn is_scheduled(&self) -> bool {
        self.active && !self.schedule.trim().is_empty()
    }
}
