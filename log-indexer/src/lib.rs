//! # Log Indexer
//!
//! Main library for the access log indexer.
//!
//! This crate reads configuration, wires the pipeline dependencies and
//! decodes the storage notifications that name the objects to index.

pub mod batch;
pub mod config;
pub mod event;

pub use batch::run_batch;
pub use config::{Dependencies, Settings};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] log_indexer_pipeline::PipelineError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] log_indexer_repository::SearchError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The notification document could not be decoded.
    #[error("Event error: {0}")]
    EventError(String),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create an event error.
    pub fn event(msg: impl Into<String>) -> Self {
        Self::EventError(msg.into())
    }
}
