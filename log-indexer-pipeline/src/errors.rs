//! Error types for the log indexer pipeline.

use log_indexer_repository::SearchError;
use thiserror::Error;

use crate::source::StorageError;

/// Errors that end the processing of one source object.
///
/// Line-level parse failures are not represented here: they are absorbed
/// by the transformer and turned into marker documents.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// Required configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The object could not be fetched from storage.
    #[error("Storage error for s3://{bucket}/{key}: {source}")]
    StorageError {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    /// Reading the object body failed mid-stream.
    #[error("Read error: {0}")]
    ReadError(String),

    /// The compressed stream is malformed or truncated.
    #[error("Decompression error: {0}")]
    DecompressionError(String),

    /// The indexing endpoint rejected a document or was unreachable.
    #[error("Submission error: {0}")]
    SubmissionError(#[from] SearchError),

    /// A stage hung up before the pipeline finished.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl PipelineError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create a storage error for the given object.
    pub fn storage(bucket: impl Into<String>, key: impl Into<String>, source: StorageError) -> Self {
        Self::StorageError {
            bucket: bucket.into(),
            key: key.into(),
            source,
        }
    }

    /// Create a read error.
    pub fn read(msg: impl Into<String>) -> Self {
        Self::ReadError(msg.into())
    }

    /// Create a decompression error.
    pub fn decompression(msg: impl Into<String>) -> Self {
        Self::DecompressionError(msg.into())
    }

    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }
}
