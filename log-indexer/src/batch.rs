//! Batch dispatch: every notification element ends in exactly one callback.

use tracing::{error, warn};

use crate::config::{Dependencies, Settings};
use crate::event::EventEntry;
use log_indexer_pipeline::orchestrator::{reject_batch, CompletionHandler, ObjectOutcome};
use log_indexer_pipeline::PipelineError;

/// Run every entry of a batch and report each one to `handler`.
///
/// Undecodable records, a missing endpoint and dependency setup failures
/// fail the affected objects through the handler instead of aborting the
/// batch.
pub async fn run_batch(
    settings: &Settings,
    entries: Vec<EventEntry>,
    handler: &dyn CompletionHandler,
) -> Vec<ObjectOutcome> {
    let mut outcomes = Vec::with_capacity(entries.len());
    let mut sources = Vec::with_capacity(entries.len());

    for entry in entries {
        match entry {
            Ok(source) => sources.push(source),
            Err(rejected) => outcomes.extend(reject_batch(
                vec![rejected.source],
                handler,
                PipelineError::configuration(rejected.reason),
            )),
        }
    }

    if sources.is_empty() {
        return outcomes;
    }

    if settings.endpoint.is_none() {
        error!("ES_ENDPOINT is not set, failing every object");
        outcomes.extend(reject_batch(
            sources,
            handler,
            PipelineError::configuration("ES_ENDPOINT is not set"),
        ));
        return outcomes;
    }

    match Dependencies::new(settings).await {
        Ok(dependencies) => {
            outcomes.extend(dependencies.orchestrator.process_batch(sources, handler).await);
        }
        Err(e) => {
            warn!(error = %e, objects = sources.len(), "Dependency setup failed, failing every object");
            outcomes.extend(reject_batch(
                sources,
                handler,
                PipelineError::configuration(e.to_string()),
            ));
        }
    }

    outcomes
}
