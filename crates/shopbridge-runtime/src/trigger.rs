//! Event trigger dispatch
//!
//! Maps `(source, event)` pairs to the connections subscribed to them and
//! runs every active subscriber concurrently when the event fires.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use shopbridge_core::Connection;

use crate::error::Result;
use crate::pipeline::{PipelineRunner, RunOutcome};
use crate::store::ConfigStore;

type EventKey = (String, String);

/// Routes source events to subscribed connections
pub struct TriggerDispatcher {
    runner: PipelineRunner,
    configs: Arc<dyn ConfigStore>,
    subscriptions: RwLock<HashMap<EventKey, BTreeSet<String>>>,
}

impl TriggerDispatcher {
    /// Create a dispatcher with no subscriptions
    pub fn new(runner: PipelineRunner, configs: Arc<dyn ConfigStore>) -> Self {
        Self {
            runner,
            configs,
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a dispatcher subscribed to every trigger the connections declare
    pub fn from_connections<'a>(
        runner: PipelineRunner,
        configs: Arc<dyn ConfigStore>,
        connections: impl IntoIterator<Item = &'a Connection>,
    ) -> Self {
        let mut subscriptions: HashMap<EventKey, BTreeSet<String>> = HashMap::new();
        for connection in connections {
            for trigger in &connection.triggers {
                subscriptions
                    .entry((trigger.source.clone(), trigger.event.clone()))
                    .or_default()
                    .insert(connection.id.clone());
            }
        }
        Self {
            runner,
            configs,
            subscriptions: RwLock::new(subscriptions),
        }
    }

    /// Subscribe a connection to an event
    pub async fn subscribe(&self, source_id: &str, event: &str, connection_id: &str) {
        self.subscriptions
            .write()
            .await
            .entry((source_id.to_string(), event.to_string()))
            .or_default()
            .insert(connection_id.to_string());
    }

    /// Remove a subscription; returns whether it existed
    pub async fn unsubscribe(&self, source_id: &str, event: &str, connection_id: &str) -> bool {
        let mut subscriptions = self.subscriptions.write().await;
        let key = (source_id.to_string(), event.to_string());
        let Some(subscribers) = subscriptions.get_mut(&key) else {
            return false;
        };
        let removed = subscribers.remove(connection_id);
        if subscribers.is_empty() {
            subscriptions.remove(&key);
        }
        removed
    }

    /// Connections subscribed to an event, in id order
    pub async fn subscribers(&self, source_id: &str, event: &str) -> Vec<String> {
        self.subscriptions
            .read()
            .await
            .get(&(source_id.to_string(), event.to_string()))
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Start a pipeline run for every active subscriber of an event.
    ///
    /// The payload becomes the run's records: an array is a batch, `null`
    /// falls back to fetching from the source, and any other value is a
    /// single record. Runs are independent; one failing does not affect the
    /// others.
    pub async fn handle_trigger(
        &self,
        source_id: &str,
        event: &str,
        payload: Value,
    ) -> Result<TriggerBatch> {
        debug!(source = %source_id, event = %event, "handle_trigger called");
        let records = match payload {
            Value::Null => None,
            Value::Array(items) => Some(items),
            other => Some(vec![other]),
        };

        // Resolve every subscriber before spawning so a store error starts nothing
        let mut active = Vec::new();
        for connection_id in self.subscribers(source_id, event).await {
            match self.configs.connection(&connection_id).await? {
                Some(connection) if connection.active => active.push(connection_id),
                Some(_) => debug!(connection = %connection_id, "skipping inactive connection"),
                None => warn!(connection = %connection_id, "subscribed connection not found"),
            }
        }

        let mut runs = Vec::new();
        for connection_id in active {
            let runner = self.runner.clone();
            let records = records.clone();
            let id = connection_id.clone();
            let handle = tokio::spawn(async move {
                let result = match records {
                    Some(records) => runner.run_with_records(&id, records).await,
                    None => runner.run(&id).await,
                };
                if let Err(e) = &result {
                    warn!(connection = %id, error = %e, "triggered run failed");
                }
                result
            });
            runs.push((connection_id, handle));
        }

        info!(source = %source_id, event = %event, runs = runs.len(), "trigger dispatched");
        Ok(TriggerBatch { runs })
    }
}

/// Runs started by one trigger.
///
/// Dropping the batch detaches the runs; they still complete.
pub struct TriggerBatch {
    runs: Vec<(String, JoinHandle<Result<RunOutcome>>)>,
}

impl TriggerBatch {
    /// Connections the trigger started
    pub fn connection_ids(&self) -> impl Iterator<Item = &str> {
        self.runs.iter().map(|(id, _)| id.as_str())
    }

    /// Number of runs started
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether no subscriber ran
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Wait for every run and collect the outcomes in subscriber order
    pub async fn wait(self) -> Vec<(String, Result<RunOutcome>)> {
        let (ids, handles): (Vec<String>, Vec<_>) = self.runs.into_iter().unzip();
        let joined = futures::future::join_all(handles).await;

        ids.into_iter()
            .zip(joined)
            .filter_map(|(id, joined)| match joined {
                Ok(result) => Some((id, result)),
                Err(e) => {
                    error!(connection = %id, error = %e, "triggered run panicked");
                    None
                }
            })
            .collect()
    }
}
