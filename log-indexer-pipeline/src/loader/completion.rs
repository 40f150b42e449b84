//! Exactly-once outcome reporting for one source object.

use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::errors::PipelineError;
use crate::loader::tally::PipelineSummary;

/// Final result of one source object.
pub type Outcome = Result<PipelineSummary, PipelineError>;

/// Delivers the first outcome reported and ignores the rest.
///
/// Shared by every in-flight submission; whichever resolution first
/// observes success or failure wins.
pub struct CompletionSignal {
    sender: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl CompletionSignal {
    /// Create a signal and the receiver its outcome is delivered to.
    pub fn new() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sender: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Report success. Returns `false` if an outcome was already reported.
    pub fn succeed(&self, summary: PipelineSummary) -> bool {
        self.resolve(Ok(summary))
    }

    /// Report failure. Returns `false` if an outcome was already reported.
    pub fn fail(&self, error: PipelineError) -> bool {
        self.resolve(Err(error))
    }

    pub fn is_resolved(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn resolve(&self, outcome: Outcome) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            Some(tx) => {
                // Receiver gone means the caller stopped waiting; the report still counts.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }
}
