//! Pipeline runner
//!
//! One run is a fetch → transform → push cycle for one connection, recorded
//! as an [`Execution`].

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use shopbridge_core::connectors::{ConnectorConfig, FileSink, FileSource};
use shopbridge_core::{Config, Connection, Fetch, Push, TransformEngine, Transformer};

use crate::error::{Error, Result};
use crate::store::{ConfigStore, Execution, ExecutionStore};

/// Fetch and push capabilities by connector reference
#[derive(Default)]
pub struct ConnectorRegistry {
    sources: HashMap<String, Arc<dyn Fetch>>,
    targets: HashMap<String, Arc<dyn Push>>,
}

impl ConnectorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build file connectors for every source and target a project's
    /// connections reference
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        for connection in config.load_connections()? {
            if !registry.sources.contains_key(&connection.source) {
                let file = file_connector(config, &connection.source)?;
                registry.register_source(&connection.source, Arc::new(FileSource::new(file)));
            }
            if !registry.targets.contains_key(&connection.target) {
                let file = file_connector(config, &connection.target)?;
                registry.register_target(&connection.target, Arc::new(FileSink::new(file)));
            }
        }
        debug!(
            sources = registry.sources.len(),
            targets = registry.targets.len(),
            "built connector registry"
        );
        Ok(registry)
    }

    /// Register a source under a reference, replacing any previous one
    pub fn register_source(&mut self, reference: impl Into<String>, source: Arc<dyn Fetch>) {
        self.sources.insert(reference.into(), source);
    }

    /// Register a target under a reference, replacing any previous one
    pub fn register_target(&mut self, reference: impl Into<String>, target: Arc<dyn Push>) {
        self.targets.insert(reference.into(), target);
    }

    /// Look up a source
    pub fn source(&self, reference: &str) -> Result<Arc<dyn Fetch>> {
        self.sources
            .get(reference)
            .cloned()
            .ok_or_else(|| Error::SourceNotFound(reference.to_string()))
    }

    /// Look up a target
    pub fn target(&self, reference: &str) -> Result<Arc<dyn Push>> {
        self.targets
            .get(reference)
            .cloned()
            .ok_or_else(|| Error::TargetNotFound(reference.to_string()))
    }
}

fn file_connector(
    config: &Config,
    reference: &str,
) -> Result<shopbridge_core::connectors::FileConnectorConfig> {
    let ConnectorConfig::File(mut file) = config.load_connector_config(reference)?;
    file.path = config.resolve_path(&file.path).display().to_string();
    Ok(file)
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    /// Execution record of the run
    pub execution_id: String,

    /// Records fetched (or supplied by an event)
    pub fetched: usize,

    /// Records pushed to the target
    pub pushed: usize,
}

enum Input {
    Fetch(Arc<dyn Fetch>),
    Records(Vec<Value>),
}

/// Runs connections end to end
#[derive(Clone)]
pub struct PipelineRunner {
    configs: Arc<dyn ConfigStore>,
    executions: Arc<dyn ExecutionStore>,
    connectors: Arc<ConnectorRegistry>,
}

impl PipelineRunner {
    /// Create a runner over the given stores and connectors
    pub fn new(
        configs: Arc<dyn ConfigStore>,
        executions: Arc<dyn ExecutionStore>,
        connectors: Arc<ConnectorRegistry>,
    ) -> Self {
        Self {
            configs,
            executions,
            connectors,
        }
    }

    /// Fetch, transform, and push once for a connection
    pub async fn run(&self, connection_id: &str) -> Result<RunOutcome> {
        debug!(connection = %connection_id, "running pipeline");
        let connection = self.connection(connection_id).await?;
        self.run_connection(&connection).await
    }

    /// Fetch, transform, and push once for a connection the caller already
    /// holds. Only the transformer is read from the configuration store.
    pub async fn run_connection(&self, connection: &Connection) -> Result<RunOutcome> {
        let transformer = self.transformer(&connection.transformer).await?;
        let source = self.connectors.source(&connection.source)?;
        self.execute(connection, &transformer, Input::Fetch(source))
            .await
    }

    /// Transform and push records supplied by the caller, skipping the fetch
    pub async fn run_with_records(
        &self,
        connection_id: &str,
        records: Vec<Value>,
    ) -> Result<RunOutcome> {
        debug!(connection = %connection_id, count = records.len(), "running pipeline with supplied records");
        let connection = self.connection(connection_id).await?;
        let transformer = self.transformer(&connection.transformer).await?;
        self.execute(&connection, &transformer, Input::Records(records))
            .await
    }

    async fn connection(&self, connection_id: &str) -> Result<Connection> {
        self.configs
            .connection(connection_id)
            .await?
            .ok_or_else(|| Error::ConnectionNotFound(connection_id.to_string()))
    }

    async fn transformer(&self, transformer_id: &str) -> Result<Transformer> {
        self.configs
            .transformer(transformer_id)
            .await?
            .ok_or_else(|| Error::TransformerNotFound(transformer_id.to_string()))
    }

    async fn execute(
        &self,
        connection: &Connection,
        transformer: &Transformer,
        input: Input,
    ) -> Result<RunOutcome> {
        let target = self.connectors.target(&connection.target)?;

        let mut execution = Execution::start(&connection.id);
        self.executions.create(&execution).await?;

        let result = self
            .process(connection, transformer, input, target.as_ref(), &mut execution)
            .await;

        match &result {
            Ok(_) => execution.succeed(),
            Err(e) => {
                warn!(connection = %connection.id, execution = %execution.id, error = %e, "pipeline run failed");
                execution.fail(e.to_string());
            }
        }
        if let Err(e) = self.executions.update(&execution).await {
            if result.is_ok() {
                return Err(e);
            }
            // Keep the run's own error for the caller
            error!(connection = %connection.id, execution = %execution.id, error = %e, "failed to record execution");
        }

        let fetched = execution.source_data.len();
        let pushed = execution.target_data.len();
        result?;

        info!(
            connection = %connection.id,
            execution = %execution.id,
            fetched,
            pushed,
            "pipeline run succeeded"
        );
        Ok(RunOutcome {
            execution_id: execution.id,
            fetched,
            pushed,
        })
    }

    async fn process(
        &self,
        connection: &Connection,
        transformer: &Transformer,
        input: Input,
        target: &dyn Push,
        execution: &mut Execution,
    ) -> Result<()> {
        execution.source_data = match input {
            Input::Records(records) => records,
            Input::Fetch(source) => {
                source
                    .fetch(&connection.query)
                    .await
                    .map_err(|source| Error::Fetch {
                        source_id: connection.source.clone(),
                        source,
                    })?
            }
        };

        if execution.source_data.is_empty() {
            debug!(connection = %connection.id, "no records to push");
            return Ok(());
        }

        let mut engine = TransformEngine::new(transformer);
        if let Some(schema) = target.schema() {
            engine = engine.with_target_schema(schema);
        }
        let transformed = engine
            .transform_all(&execution.source_data)
            .map_err(Error::Transform)?;

        execution.target_data = transformed;
        target
            .push(&execution.target_data)
            .await
            .map_err(|source| Error::Push {
                target_id: connection.target.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ExecutionStatus, MemoryExecutionStore};
    use crate::testing::{RecordingSink, StaticSource, runner};
    use serde_json::json;
    use shopbridge_core::{FieldMapping, Function};

    fn names_transformer() -> Transformer {
        Transformer::new("names")
            .with_mappings([
                FieldMapping::new("first_name", "name.first"),
                FieldMapping::new("last_name", "name.last"),
            ])
            .with_functions([Function::new("concatenate", "greeting", ["'Hello, '", "first_name"])])
    }

    async fn only_execution(store: &MemoryExecutionStore) -> Execution {
        let all = store.all().await;
        assert_eq!(all.len(), 1);
        all.into_iter().next().unwrap()
    }

    #[tokio::test]
    async fn test_run_fetches_transforms_and_pushes() {
        let source = Arc::new(StaticSource::new(vec![
            json!({"first_name": "Jane", "last_name": "Doe"}),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let (runner, executions) = runner(
            [Connection::new("people", "crm.people", "erp.contacts", "names")],
            [names_transformer()],
            source.clone(),
            sink.clone(),
        );

        let outcome = runner.run("people").await.unwrap();
        assert_eq!(outcome.fetched, 1);
        assert_eq!(outcome.pushed, 1);

        let expected = json!({"name": {"first": "Jane", "last": "Doe"}, "greeting": "Hello, Jane"});
        assert_eq!(sink.batches(), vec![vec![expected.clone()]]);

        let execution = only_execution(&executions).await;
        assert_eq!(execution.id, outcome.execution_id);
        assert_eq!(execution.status, ExecutionStatus::Success);
        assert_eq!(execution.target_data, vec![expected]);
        assert_eq!(execution.source_data.len(), 1);
        assert!(execution.error.is_none());
    }

    #[tokio::test]
    async fn test_run_passes_connection_query_to_source() {
        let source = Arc::new(StaticSource::new(vec![]));
        let mut query = shopbridge_core::Query::new();
        query.insert("status".to_string(), json!("processing"));
        let (runner, _) = runner(
            [Connection::new("orders", "shop.orders", "erp.orders", "names").with_query(query.clone())],
            [names_transformer()],
            source.clone(),
            Arc::new(RecordingSink::default()),
        );

        runner.run("orders").await.unwrap();
        assert_eq!(source.queries(), vec![query]);
    }

    #[tokio::test]
    async fn test_zero_records_succeeds_without_push() {
        let sink = Arc::new(RecordingSink::default());
        let (runner, executions) = runner(
            [Connection::new("people", "crm.people", "erp.contacts", "names")],
            [names_transformer()],
            Arc::new(StaticSource::new(vec![])),
            sink.clone(),
        );

        let outcome = runner.run("people").await.unwrap();
        assert_eq!(outcome.pushed, 0);
        assert_eq!(sink.push_count(), 0);

        let execution = only_execution(&executions).await;
        assert_eq!(execution.status, ExecutionStatus::Success);
        assert!(execution.target_data.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_execution() {
        let sink = Arc::new(RecordingSink::default());
        let (runner, executions) = runner(
            [Connection::new("people", "crm.people", "erp.contacts", "names")],
            [names_transformer()],
            Arc::new(StaticSource::failing("timeout")),
            sink.clone(),
        );

        let err = runner.run("people").await.unwrap_err();
        assert!(matches!(err, Error::Fetch { ref source_id, .. } if source_id == "crm.people"));
        assert_eq!(sink.push_count(), 0);

        let execution = only_execution(&executions).await;
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution.error.unwrap().contains("timeout"));
        assert!(execution.end_time.is_some());
    }

    #[tokio::test]
    async fn test_one_bad_record_fails_whole_run() {
        let sink = Arc::new(RecordingSink::default());
        let transformer = Transformer::new("broken")
            .with_functions([Function::new("shout", "loud", ["name"])]);
        let (runner, executions) = runner(
            [Connection::new("people", "crm.people", "erp.contacts", "broken")],
            [transformer],
            Arc::new(StaticSource::new(vec![json!({"name": "a"}), json!({"name": "b"})])),
            sink.clone(),
        );

        let err = runner.run("people").await.unwrap_err();
        assert!(matches!(err, Error::Transform(_)));
        assert_eq!(sink.push_count(), 0);

        let execution = only_execution(&executions).await;
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_eq!(execution.source_data.len(), 2);
        assert!(execution.target_data.is_empty());
    }

    #[tokio::test]
    async fn test_push_failure_keeps_snapshots() {
        let sink = Arc::new(RecordingSink::failing("rejected"));
        let (runner, executions) = runner(
            [Connection::new("people", "crm.people", "erp.contacts", "names")],
            [names_transformer()],
            Arc::new(StaticSource::new(vec![json!({"first_name": "Jane"})])),
            sink.clone(),
        );

        let err = runner.run("people").await.unwrap_err();
        assert!(matches!(err, Error::Push { .. }));

        let execution = only_execution(&executions).await;
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_eq!(execution.target_data.len(), 1);
        assert!(execution.error.unwrap().contains("rejected"));
    }

    #[tokio::test]
    async fn test_missing_configuration_creates_no_execution() {
        let (runner, executions) = runner(
            [Connection::new("people", "crm.people", "erp.contacts", "missing")],
            Vec::<Transformer>::new(),
            Arc::new(StaticSource::new(vec![])),
            Arc::new(RecordingSink::default()),
        );

        assert!(matches!(
            runner.run("unknown").await,
            Err(Error::ConnectionNotFound(_))
        ));
        assert!(matches!(
            runner.run("people").await,
            Err(Error::TransformerNotFound(_))
        ));
        assert!(executions.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_connector_creates_no_execution() {
        let (runner, executions) = runner(
            [Connection::new("people", "crm.people", "erp.contacts", "names")],
            [names_transformer()],
            Arc::new(StaticSource::new(vec![json!({"first_name": "Jane"})])),
            Arc::new(RecordingSink::default()),
        );

        let unknown_source = Connection::new("people", "crm.leads", "erp.contacts", "names");
        assert!(matches!(
            runner.run_connection(&unknown_source).await,
            Err(Error::SourceNotFound(ref id)) if id == "crm.leads"
        ));
        let unknown_target = Connection::new("people", "crm.people", "erp.leads", "names");
        assert!(matches!(
            runner.run_connection(&unknown_target).await,
            Err(Error::TargetNotFound(ref id)) if id == "erp.leads"
        ));
        assert!(executions.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_run_connection_uses_given_connection() {
        let source = Arc::new(StaticSource::new(vec![json!({"first_name": "Jane"})]));
        let sink = Arc::new(RecordingSink::default());
        let (runner, executions) = runner(
            [Connection::new("people", "crm.people", "erp.contacts", "names")],
            [names_transformer()],
            source.clone(),
            sink.clone(),
        );

        let mut query = shopbridge_core::Query::new();
        query.insert("segment".to_string(), json!("vip"));
        let adhoc = Connection::new("adhoc", "crm.people", "erp.contacts", "names").with_query(query.clone());

        let outcome = runner.run_connection(&adhoc).await.unwrap();
        assert_eq!(outcome.pushed, 1);
        assert_eq!(source.queries(), vec![query]);
        assert_eq!(executions.list("adhoc").await.unwrap().len(), 1);
        assert!(matches!(
            runner.run("adhoc").await,
            Err(Error::ConnectionNotFound(_))
        ));
    }

    /// Records creations but rejects every update
    struct ReadOnlyExecutions(MemoryExecutionStore);

    #[async_trait::async_trait]
    impl ExecutionStore for ReadOnlyExecutions {
        async fn create(&self, execution: &Execution) -> Result<()> {
            self.0.create(execution).await
        }

        async fn update(&self, execution: &Execution) -> Result<()> {
            Err(Error::ExecutionNotFound(execution.id.clone()))
        }

        async fn get(&self, id: &str) -> Result<Option<Execution>> {
            self.0.get(id).await
        }

        async fn list(&self, connection_id: &str) -> Result<Vec<Execution>> {
            self.0.list(connection_id).await
        }
    }

    fn read_only_runner(source: StaticSource) -> PipelineRunner {
        let mut registry = ConnectorRegistry::new();
        registry.register_source("crm.people", Arc::new(source));
        registry.register_target("erp.contacts", Arc::new(RecordingSink::default()));
        PipelineRunner::new(
            Arc::new(crate::store::MemoryConfigStore::new(
                [Connection::new("people", "crm.people", "erp.contacts", "names")],
                [names_transformer()],
            )),
            Arc::new(ReadOnlyExecutions(MemoryExecutionStore::new())),
            Arc::new(registry),
        )
    }

    #[tokio::test]
    async fn test_failed_run_keeps_its_error_when_recording_fails() {
        let runner = read_only_runner(StaticSource::failing("timeout"));
        let err = runner.run("people").await.unwrap_err();
        assert!(matches!(err, Error::Fetch { ref source_id, .. } if source_id == "crm.people"));
    }

    #[tokio::test]
    async fn test_successful_run_reports_recording_failure() {
        let runner = read_only_runner(StaticSource::new(vec![json!({"first_name": "Jane"})]));
        let err = runner.run("people").await.unwrap_err();
        assert!(matches!(err, Error::ExecutionNotFound(_)));
    }

    #[tokio::test]
    async fn test_run_with_records_skips_fetch() {
        let source = Arc::new(StaticSource::new(vec![json!({"first_name": "Unused"})]));
        let sink = Arc::new(RecordingSink::default());
        let (runner, _) = runner(
            [Connection::new("people", "crm.people", "erp.contacts", "names")],
            [names_transformer()],
            source.clone(),
            sink.clone(),
        );

        let outcome = runner
            .run_with_records("people", vec![json!({"first_name": "Ann"})])
            .await
            .unwrap();
        assert_eq!(outcome.fetched, 1);
        assert!(source.queries().is_empty());
        assert_eq!(sink.batches()[0][0]["name"]["first"], "Ann");
    }

    #[tokio::test]
    async fn test_target_schema_drives_coercion() {
        let schema = shopbridge_core::Schema::new("listings").with_field(
            shopbridge_core::FieldDefinition::new("price", shopbridge_core::FieldType::Number),
        );
        let sink = Arc::new(RecordingSink::default().with_schema(schema));
        let (runner, _) = runner(
            [Connection::new("products", "shop.products", "market.listings", "prices")],
            [Transformer::new("prices").with_mappings([FieldMapping::new("regular_price", "price")])],
            Arc::new(StaticSource::new(vec![json!({"regular_price": "19.99"})])),
            sink.clone(),
        );

        runner.run("products").await.unwrap();
        assert_eq!(sink.batches()[0][0], json!({"price": 19.99}));
    }

    #[tokio::test]
    async fn test_registry_from_config_resolves_relative_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("shopbridge.yaml"), "name: test\n").unwrap();
        std::fs::create_dir_all(dir.path().join("connectors")).unwrap();
        std::fs::create_dir_all(dir.path().join("connections")).unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(
            dir.path().join("connectors/file.yaml"),
            "input:\n  type: file\n  path: data/in.jsonl\noutput:\n  type: file\n  path: data/out.jsonl\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("connections/sync.yaml"),
            "id: sync\nsource: file.input\ntarget: file.output\ntransformer: copy\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("data/in.jsonl"), "{\"a\": 1}\n").unwrap();

        let config = Config::load(dir.path()).unwrap();
        let registry = ConnectorRegistry::from_config(&config).unwrap();

        let records = registry
            .source("file.input")
            .unwrap()
            .fetch(&shopbridge_core::Query::new())
            .await
            .unwrap();
        assert_eq!(records, vec![json!({"a": 1})]);
        assert!(registry.target("file.output").is_ok());
        assert!(matches!(
            registry.target("file.input"),
            Err(Error::TargetNotFound(_))
        ));
    }
}
