//! Concurrent document delivery with drain detection.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, Instrument};

use crate::errors::PipelineError;
use crate::loader::completion::CompletionSignal;
use crate::loader::tally::{PipelineSummary, PipelineTally};
use crate::processor::RecordStream;
use log_indexer_repository::SearchEngineClient;
use log_indexer_shared::IndexTarget;

/// Configuration for the document loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Maximum number of submissions awaiting a response.
    pub max_in_flight: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { max_in_flight: 64 }
    }
}

/// Loader that submits one document per record to the search engine.
///
/// Submissions for an object run concurrently and may resolve in any
/// order. The first failed submission fails the whole object; success is
/// reported once the record stream has ended and every counted line has
/// resolved.
pub struct DocumentLoader {
    client: Arc<dyn SearchEngineClient>,
    target: Arc<IndexTarget>,
    config: LoaderConfig,
}

impl DocumentLoader {
    pub fn new(client: Arc<dyn SearchEngineClient>, target: IndexTarget) -> Self {
        Self::with_config(client, target, LoaderConfig::default())
    }

    pub fn with_config(
        client: Arc<dyn SearchEngineClient>,
        target: IndexTarget,
        config: LoaderConfig,
    ) -> Self {
        Self {
            client,
            target: Arc::new(target),
            config,
        }
    }

    pub fn target(&self) -> &IndexTarget {
        &self.target
    }

    /// Deliver every record and wait for the object's outcome.
    ///
    /// `tally` must be the same tally the records were counted into.
    #[instrument(skip_all, fields(index = %self.target.index_name))]
    pub async fn deliver(
        &self,
        records: RecordStream,
        tally: Arc<PipelineTally>,
    ) -> Result<PipelineSummary, PipelineError> {
        let (signal, mut outcome_rx) = CompletionSignal::new();
        let signal = Arc::new(signal);
        let permits = Arc::new(Semaphore::new(self.config.max_in_flight.max(1)));

        let feed = self.feed(records, &tally, &signal, &permits);

        let early = tokio::select! {
            biased;
            outcome = &mut outcome_rx => Some(outcome),
            () = feed => None,
        };

        let outcome = match early {
            Some(outcome) => outcome,
            None => outcome_rx.await,
        };

        outcome.map_err(|_| PipelineError::channel("completion signal dropped without an outcome"))?
    }

    async fn feed(
        &self,
        mut records: RecordStream,
        tally: &Arc<PipelineTally>,
        signal: &Arc<CompletionSignal>,
        permits: &Arc<Semaphore>,
    ) {
        let mut sequence: u64 = 0;

        while let Some(item) = records.next().await {
            if signal.is_resolved() {
                return;
            }

            let document = match item {
                Ok(document) => document,
                Err(e) => {
                    error!(error = %e, "Record stream failed");
                    signal.fail(e);
                    return;
                }
            };

            let permit = match permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    signal.fail(PipelineError::channel("submission limiter closed"));
                    return;
                }
            };

            sequence += 1;
            let submission = Submission {
                client: self.client.clone(),
                target: self.target.clone(),
                tally: tally.clone(),
                signal: signal.clone(),
                sequence,
            };
            let panic_signal = signal.clone();

            tokio::spawn(
                async move {
                    // A panicking submission never resolves, so it has to fail the object itself.
                    if AssertUnwindSafe(submission.run(document))
                        .catch_unwind()
                        .await
                        .is_err()
                    {
                        error!(sequence, "Document submission panicked");
                        panic_signal.fail(PipelineError::channel(format!(
                            "submission {} panicked",
                            sequence
                        )));
                    }
                    drop(permit);
                }
                .in_current_span(),
            );
        }

        tally.mark_exhausted();
        debug!(
            submitted = sequence,
            total_lines = tally.snapshot().total_lines,
            "Record stream exhausted"
        );
        report_if_drained(tally, signal);
    }
}

/// One in-flight document.
struct Submission {
    client: Arc<dyn SearchEngineClient>,
    target: Arc<IndexTarget>,
    tally: Arc<PipelineTally>,
    signal: Arc<CompletionSignal>,
    sequence: u64,
}

impl Submission {
    async fn run(self, document: String) {
        match self.client.index_document(&self.target, document).await {
            Ok(response) => {
                let completed = self.tally.record_resolution(true);
                debug!(
                    sequence = self.sequence,
                    completed,
                    status = response.status,
                    body = %response.body,
                    "Document indexed"
                );
                report_if_drained(&self.tally, &self.signal);
            }
            Err(e) => {
                error!(
                    sequence = self.sequence,
                    total_lines = self.tally.snapshot().total_lines,
                    error = %e,
                    "Document submission failed"
                );
                // Fail before counting so no drain check can report success first.
                self.signal.fail(e.into());
                self.tally.record_resolution(false);
            }
        }
    }
}

fn report_if_drained(tally: &PipelineTally, signal: &CompletionSignal) {
    if tally.is_drained() {
        let summary = tally.snapshot();
        if signal.succeed(summary) {
            info!(
                total_lines = summary.total_lines,
                parse_failures = summary.parse_failures,
                "All documents indexed"
            );
        }
    }
}
