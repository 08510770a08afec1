//! In-memory connectors for unit tests

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shopbridge_core::{Connection, Fetch, Push, Query, Schema, Transformer};

use crate::pipeline::{ConnectorRegistry, PipelineRunner};
use crate::store::{MemoryConfigStore, MemoryExecutionStore};

/// Returns the same records on every fetch, or the same error
pub struct StaticSource {
    records: Vec<Value>,
    failure: Option<String>,
    queries: Mutex<Vec<Query>>,
}

impl StaticSource {
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records,
            failure: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn queries(&self) -> Vec<Query> {
        self.queries.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetch for StaticSource {
    async fn fetch(&self, query: &Query) -> shopbridge_core::Result<Vec<Value>> {
        self.queries.lock().unwrap().push(query.clone());
        match &self.failure {
            Some(message) => Err(shopbridge_core::Error::Connector {
                connector: "static".to_string(),
                message: message.clone(),
            }),
            None => Ok(self.records.clone()),
        }
    }
}

/// Takes `delay` to answer every fetch and tracks how many fetches overlap
pub struct SlowSource {
    records: Vec<Value>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowSource {
    pub fn new(records: Vec<Value>, delay: Duration) -> Self {
        Self {
            records,
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for SlowSource {
    async fn fetch(&self, _query: &Query) -> shopbridge_core::Result<Vec<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }
}

/// Keeps every pushed batch
#[derive(Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<Vec<Value>>>,
    failure: Option<String>,
    schema: Option<Schema>,
}

impl RecordingSink {
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn batches(&self) -> Vec<Vec<Value>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn push_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl Push for RecordingSink {
    async fn push(&self, records: &[Value]) -> shopbridge_core::Result<()> {
        if let Some(message) = &self.failure {
            return Err(shopbridge_core::Error::Connector {
                connector: "recording".to_string(),
                message: message.clone(),
            });
        }
        self.batches.lock().unwrap().push(records.to_vec());
        Ok(())
    }

    fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }
}

/// Runner whose connections all share one source and one sink
pub fn runner(
    connections: impl IntoIterator<Item = Connection>,
    transformers: impl IntoIterator<Item = Transformer>,
    source: Arc<dyn Fetch>,
    sink: Arc<dyn Push>,
) -> (PipelineRunner, Arc<MemoryExecutionStore>) {
    let connections: Vec<Connection> = connections.into_iter().collect();
    let mut registry = ConnectorRegistry::new();
    for connection in &connections {
        registry.register_source(&connection.source, source.clone());
        registry.register_target(&connection.target, sink.clone());
    }

    let executions = Arc::new(MemoryExecutionStore::new());
    let runner = PipelineRunner::new(
        Arc::new(MemoryConfigStore::new(connections, transformers)),
        executions.clone(),
        Arc::new(registry),
    );
    (runner, executions)
}
