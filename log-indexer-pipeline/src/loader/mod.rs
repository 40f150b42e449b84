//! Loader module for the log indexer pipeline.
//!
//! Submits documents to the search engine and decides when an object is
//! finished.

mod completion;
mod sink;
mod tally;

pub use completion::{CompletionSignal, Outcome};
pub use sink::{DocumentLoader, LoaderConfig};
pub use tally::{PipelineSummary, PipelineTally};
