//! Orchestrator module for the log indexer pipeline.
//!
//! Wires source, processor and loader for each object in a batch and
//! reports every object's outcome exactly once.

use std::sync::Arc;

use futures::future::join_all;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, instrument, warn, Instrument};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::loader::{DocumentLoader, LoaderConfig, PipelineSummary, PipelineTally};
use crate::processor::{LogParser, RecordStream, RecordTransformer};
use crate::source::{gunzip, split_lines, ObjectStore};
use log_indexer_repository::SearchEngineClient;
use log_indexer_shared::{IndexTarget, SourceObject};

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the channel between the transform stage and the loader.
    pub channel_buffer_size: usize,
    /// Maximum concurrent submissions per object.
    pub max_in_flight: usize,
    /// Indexing endpoint the client was built for.
    pub endpoint: Option<String>,
    /// Region used for signing and storage access.
    pub region: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 1000,
            max_in_flight: LoaderConfig::default().max_in_flight,
            endpoint: None,
            region: None,
        }
    }
}

impl OrchestratorConfig {
    /// Fail if anything needed before touching storage is missing.
    pub fn validate(&self, target: &IndexTarget) -> Result<(), PipelineError> {
        if self.endpoint.as_deref().map_or(true, |e| e.trim().is_empty()) {
            return Err(PipelineError::configuration("indexing endpoint is not set"));
        }
        if self.region.as_deref().map_or(true, |r| r.trim().is_empty()) {
            return Err(PipelineError::configuration("region is not set"));
        }
        if !target.is_complete() {
            return Err(PipelineError::configuration(
                "index name and document type must both be set",
            ));
        }
        Ok(())
    }
}

/// Lifecycle of one source object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    Pending,
    Streaming,
    Succeeded,
    Failed,
}

impl ObjectState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ObjectState::Succeeded | ObjectState::Failed)
    }

    fn can_advance_to(self, next: ObjectState) -> bool {
        use ObjectState::*;
        matches!(
            (self, next),
            (Pending, Streaming) | (Pending, Failed) | (Streaming, Succeeded) | (Streaming, Failed)
        )
    }
}

/// Tracks the state of one object and refuses to leave a terminal state.
#[derive(Debug)]
struct Lifecycle {
    state: ObjectState,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            state: ObjectState::Pending,
        }
    }

    fn advance(&mut self, next: ObjectState) -> bool {
        if !self.state.can_advance_to(next) {
            warn!(from = ?self.state, to = ?next, "Ignoring invalid state transition");
            return false;
        }
        debug!(from = ?self.state, to = ?next, "Object state changed");
        self.state = next;
        true
    }

    fn settle(&mut self, result: &Result<PipelineSummary, PipelineError>) {
        let next = if result.is_ok() {
            ObjectState::Succeeded
        } else {
            ObjectState::Failed
        };
        self.advance(next);
    }
}

/// Final report for one object.
#[derive(Debug, Clone)]
pub struct ObjectOutcome {
    pub source: SourceObject,
    pub state: ObjectState,
    pub result: Result<PipelineSummary, PipelineError>,
}

impl ObjectOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Completion callback of the invoking context.
///
/// Called exactly once per batch element.
pub trait CompletionHandler: Send + Sync {
    fn succeed(&self, source: &SourceObject, summary: &PipelineSummary);
    fn fail(&self, source: &SourceObject, error: &PipelineError);
}

/// Handler that only logs, used when the caller reads the returned outcomes.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl CompletionHandler for LoggingHandler {
    fn succeed(&self, source: &SourceObject, summary: &PipelineSummary) {
        info!(
            source = %source,
            total_lines = summary.total_lines,
            parse_failures = summary.parse_failures,
            "Object indexed"
        );
    }

    fn fail(&self, source: &SourceObject, error: &PipelineError) {
        error!(source = %source, error = %error, "Object failed");
    }
}

/// Orchestrator that runs the pipeline for each source object.
///
/// Objects in a batch run concurrently and independently; one object's
/// failure never aborts another.
pub struct Orchestrator {
    store: Arc<dyn ObjectStore>,
    parser: Arc<dyn LogParser>,
    loader: DocumentLoader,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        client: Arc<dyn SearchEngineClient>,
        parser: Arc<dyn LogParser>,
        target: IndexTarget,
    ) -> Self {
        Self::with_config(store, client, parser, target, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        store: Arc<dyn ObjectStore>,
        client: Arc<dyn SearchEngineClient>,
        parser: Arc<dyn LogParser>,
        target: IndexTarget,
        config: OrchestratorConfig,
    ) -> Self {
        let loader = DocumentLoader::with_config(
            client,
            target,
            LoaderConfig {
                max_in_flight: config.max_in_flight,
            },
        );

        Self {
            store,
            parser,
            loader,
            config,
        }
    }

    pub fn target(&self) -> &IndexTarget {
        self.loader.target()
    }

    /// Process every object in a batch.
    ///
    /// Outcomes are returned in input order.
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4(), objects = sources.len()))]
    pub async fn process_batch(
        &self,
        sources: Vec<SourceObject>,
        handler: &dyn CompletionHandler,
    ) -> Vec<ObjectOutcome> {
        info!(index = %self.target().index_name, "Processing batch");

        let outcomes = join_all(sources.into_iter().map(|source| async move {
            let outcome = self.process_object(source).await;
            report(handler, &outcome);
            outcome
        }))
        .await;

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            succeeded = outcomes.len() - failed,
            failed, "Batch complete"
        );
        outcomes
    }

    /// Run one object through the pipeline.
    #[instrument(skip(self), fields(bucket = %source.bucket, key = %source.key))]
    pub async fn process_object(&self, source: SourceObject) -> ObjectOutcome {
        let mut lifecycle = Lifecycle::new();
        let result = self.stream_object(&source, &mut lifecycle).await;
        lifecycle.settle(&result);

        ObjectOutcome {
            source,
            state: lifecycle.state,
            result,
        }
    }

    async fn stream_object(
        &self,
        source: &SourceObject,
        lifecycle: &mut Lifecycle,
    ) -> Result<PipelineSummary, PipelineError> {
        self.config.validate(self.target())?;

        let body = self.store.get_object(source).await.map_err(|e| {
            error!(
                bucket = %source.bucket,
                key = %source.key,
                error = %e,
                "Failed to open source object"
            );
            PipelineError::storage(&source.bucket, &source.key, e)
        })?;

        lifecycle.advance(ObjectState::Streaming);

        let tally = Arc::new(PipelineTally::new());
        let records = RecordTransformer::new(self.parser.clone(), tally.clone())
            .transform_stream(split_lines(gunzip(body)));

        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        tokio::spawn(forward(records, tx).in_current_span());

        self.loader
            .deliver(ReceiverStream::new(rx).boxed(), tally)
            .await
    }
}

/// Fail every object without touching storage.
///
/// Used when the process cannot build an orchestrator at all.
pub fn reject_batch(
    sources: Vec<SourceObject>,
    handler: &dyn CompletionHandler,
    error: PipelineError,
) -> Vec<ObjectOutcome> {
    sources
        .into_iter()
        .map(|source| {
            let outcome = ObjectOutcome {
                source,
                state: ObjectState::Failed,
                result: Err(error.clone()),
            };
            report(handler, &outcome);
            outcome
        })
        .collect()
}

fn report(handler: &dyn CompletionHandler, outcome: &ObjectOutcome) {
    match &outcome.result {
        Ok(summary) => handler.succeed(&outcome.source, summary),
        Err(e) => handler.fail(&outcome.source, e),
    }
}

/// Transform stage: pulls records and hands them to the loader in order.
async fn forward(
    mut records: RecordStream,
    tx: mpsc::Sender<Result<String, PipelineError>>,
) {
    while let Some(item) = records.next().await {
        let terminal = item.is_err();
        if tx.send(item).await.is_err() {
            debug!("Loader stopped receiving, ending transform stage");
            return;
        }
        if terminal {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::AlbParser;
    use crate::source::{ByteStream, MemoryObjectStore, StorageError};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use log_indexer_repository::{IndexResponse, SearchError};
    use std::io::Write;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    const GOOD_LINE: &str = r#"https 2024-03-09T10:00:00.000000Z app/lb/1 192.168.1.10:2817 10.0.0.1:80 0.001 0.002 0.000 200 200 34 366 "GET https://example.com:443/ HTTP/1.1" "curl/8.0" - - arn:tg "Root=1" "example.com" "-" 0 2024-03-09T10:00:00.000000Z "forward" "-" "-" "10.0.0.1:80" "200" "-" "-""#;

    struct RecordingClient {
        paths: Mutex<Vec<String>>,
        bodies: Mutex<Vec<String>>,
        fail_containing: Option<&'static str>,
    }

    impl RecordingClient {
        fn new() -> Self {
            Self {
                paths: Mutex::new(Vec::new()),
                bodies: Mutex::new(Vec::new()),
                fail_containing: None,
            }
        }

        fn failing_on(marker: &'static str) -> Self {
            Self {
                fail_containing: Some(marker),
                ..Self::new()
            }
        }

        fn submissions(&self) -> usize {
            self.paths.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SearchEngineClient for RecordingClient {
        async fn index_document(
            &self,
            target: &IndexTarget,
            body: String,
        ) -> Result<IndexResponse, SearchError> {
            self.paths.lock().unwrap().push(target.path());
            let fail = self
                .fail_containing
                .map_or(false, |marker| body.contains(marker));
            self.bodies.lock().unwrap().push(body);
            if fail {
                return Err(SearchError::index(400, "rejected"));
            }
            Ok(IndexResponse::new(201, r#"{"result":"created"}"#))
        }

        async fn health_check(&self) -> Result<bool, SearchError> {
            Ok(true)
        }
    }

    /// Store that counts how often it is opened.
    struct CountingStore {
        inner: MemoryObjectStore,
        opens: AtomicU64,
    }

    #[async_trait]
    impl ObjectStore for CountingStore {
        async fn get_object(&self, source: &SourceObject) -> Result<ByteStream, StorageError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.inner.get_object(source).await
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        succeeded: Mutex<Vec<SourceObject>>,
        failed: Mutex<Vec<SourceObject>>,
    }

    impl CompletionHandler for RecordingHandler {
        fn succeed(&self, source: &SourceObject, _summary: &PipelineSummary) {
            self.succeeded.lock().unwrap().push(source.clone());
        }

        fn fail(&self, source: &SourceObject, _error: &PipelineError) {
            self.failed.lock().unwrap().push(source.clone());
        }
    }

    fn gzip(lines: &[&str]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        for line in lines {
            encoder.write_all(line.as_bytes()).unwrap();
            encoder.write_all(b"\n").unwrap();
        }
        encoder.finish().unwrap()
    }

    fn target() -> IndexTarget {
        IndexTarget::dated(
            "alblogs",
            "alb-access-logs",
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
        )
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            endpoint: Some("https://search.example.com".to_string()),
            region: Some("us-east-1".to_string()),
            ..OrchestratorConfig::default()
        }
    }

    fn orchestrator(
        objects: Vec<(SourceObject, Vec<u8>)>,
        client: Arc<RecordingClient>,
        config: OrchestratorConfig,
    ) -> (Orchestrator, Arc<CountingStore>) {
        let mut inner = MemoryObjectStore::new().with_chunk_size(64);
        for (source, body) in objects {
            inner.insert(source, body);
        }
        let store = Arc::new(CountingStore {
            inner,
            opens: AtomicU64::new(0),
        });
        let orchestrator = Orchestrator::with_config(
            store.clone(),
            client,
            Arc::new(AlbParser::new()),
            target(),
            config,
        );
        (orchestrator, store)
    }

    #[tokio::test]
    async fn test_three_lines_three_posts() {
        let source = SourceObject::new("logs", "alb/one.log.gz");
        let client = Arc::new(RecordingClient::new());
        let (orchestrator, _) = orchestrator(
            vec![(source.clone(), gzip(&[GOOD_LINE, GOOD_LINE, GOOD_LINE]))],
            client.clone(),
            config(),
        );
        let handler = RecordingHandler::default();

        let outcomes = orchestrator.process_batch(vec![source.clone()], &handler).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].state, ObjectState::Succeeded);
        assert_eq!(outcomes[0].result.as_ref().unwrap().total_lines, 3);
        assert_eq!(
            *client.paths.lock().unwrap(),
            vec!["/alblogs-2024.03.09/alb-access-logs".to_string(); 3]
        );
        assert_eq!(*handler.succeeded.lock().unwrap(), vec![source]);
        assert!(handler.failed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_line_still_submitted() {
        let source = SourceObject::new("logs", "alb/mixed.log.gz");
        let client = Arc::new(RecordingClient::new());
        let (orchestrator, _) = orchestrator(
            vec![(
                source.clone(),
                gzip(&[GOOD_LINE, GOOD_LINE, "not an alb line", GOOD_LINE, GOOD_LINE]),
            )],
            client.clone(),
            config(),
        );

        let outcome = orchestrator.process_object(source).await;

        let summary = outcome.result.unwrap();
        assert_eq!(summary.total_lines, 5);
        assert_eq!(summary.completed, 5);
        assert_eq!(summary.parse_failures, 1);
        assert_eq!(client.submissions(), 5);
        assert_eq!(
            client
                .bodies
                .lock()
                .unwrap()
                .iter()
                .filter(|b| b.contains("\"raw_line\":\"not an alb line\""))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_missing_object_fails_without_submissions() {
        let source = SourceObject::new("logs", "alb/missing.log.gz");
        let client = Arc::new(RecordingClient::new());
        let (orchestrator, store) = orchestrator(Vec::new(), client.clone(), config());
        let handler = RecordingHandler::default();

        let outcomes = orchestrator.process_batch(vec![source.clone()], &handler).await;

        assert_eq!(outcomes[0].state, ObjectState::Failed);
        match &outcomes[0].result {
            Err(PipelineError::StorageError { bucket, key, source }) => {
                assert_eq!(bucket, "logs");
                assert_eq!(key, "alb/missing.log.gz");
                assert_eq!(*source, StorageError::NotFound);
            }
            other => panic!("expected storage error, got {:?}", other),
        }
        assert_eq!(store.opens.load(Ordering::SeqCst), 1);
        assert_eq!(client.submissions(), 0);
        assert_eq!(*handler.failed.lock().unwrap(), vec![source]);
        assert!(handler.succeeded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_elements_are_independent() {
        let good = SourceObject::new("logs", "alb/good.log.gz");
        let bad = SourceObject::new("logs", "alb/bad.log.gz");
        let missing = SourceObject::new("logs", "alb/missing.log.gz");
        let client = Arc::new(RecordingClient::failing_on("poison"));
        let (orchestrator, _) = orchestrator(
            vec![
                (good.clone(), gzip(&[GOOD_LINE, GOOD_LINE])),
                (bad.clone(), gzip(&[GOOD_LINE, "poison"])),
            ],
            client.clone(),
            config(),
        );
        let handler = RecordingHandler::default();

        let outcomes = orchestrator
            .process_batch(vec![good.clone(), bad.clone(), missing.clone()], &handler)
            .await;

        let states: Vec<ObjectState> = outcomes.iter().map(|o| o.state).collect();
        assert_eq!(
            states,
            vec![ObjectState::Succeeded, ObjectState::Failed, ObjectState::Failed]
        );
        assert!(matches!(
            outcomes[1].result,
            Err(PipelineError::SubmissionError(SearchError::IndexError { status: 400, .. }))
        ));
        assert_eq!(*handler.succeeded.lock().unwrap(), vec![good]);
        assert_eq!(handler.failed.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_configuration_skips_storage() {
        let source = SourceObject::new("logs", "alb/one.log.gz");
        let client = Arc::new(RecordingClient::new());
        let (orchestrator, store) = orchestrator(
            vec![(source.clone(), gzip(&[GOOD_LINE]))],
            client.clone(),
            OrchestratorConfig {
                endpoint: None,
                ..config()
            },
        );

        let outcome = orchestrator.process_object(source).await;

        assert_eq!(outcome.state, ObjectState::Failed);
        assert!(matches!(
            outcome.result,
            Err(PipelineError::ConfigurationError(_))
        ));
        assert_eq!(store.opens.load(Ordering::SeqCst), 0);
        assert_eq!(client.submissions(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_object_fails() {
        let source = SourceObject::new("logs", "alb/corrupt.log.gz");
        let mut body = gzip(&[GOOD_LINE, GOOD_LINE, GOOD_LINE]);
        body.truncate(body.len() / 2);
        let client = Arc::new(RecordingClient::new());
        let (orchestrator, _) =
            orchestrator(vec![(source.clone(), body)], client.clone(), config());

        let outcome = orchestrator.process_object(source).await;

        assert_eq!(outcome.state, ObjectState::Failed);
        assert!(matches!(
            outcome.result,
            Err(PipelineError::DecompressionError(_))
        ));
    }

    #[test]
    fn test_reject_batch_reports_each_element() {
        let handler = RecordingHandler::default();
        let sources = vec![
            SourceObject::new("logs", "a.gz"),
            SourceObject::new("logs", "b.gz"),
        ];

        let outcomes = reject_batch(
            sources.clone(),
            &handler,
            PipelineError::configuration("ES_ENDPOINT is not set"),
        );

        assert!(outcomes.iter().all(|o| o.state == ObjectState::Failed));
        assert_eq!(*handler.failed.lock().unwrap(), sources);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut lifecycle = Lifecycle::new();
        assert!(lifecycle.advance(ObjectState::Streaming));
        assert!(lifecycle.advance(ObjectState::Failed));
        assert!(!lifecycle.advance(ObjectState::Succeeded));
        assert!(!lifecycle.advance(ObjectState::Streaming));
        assert_eq!(lifecycle.state, ObjectState::Failed);
        assert!(lifecycle.state.is_terminal());
    }
}
