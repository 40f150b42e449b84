//! Storage interface the pipeline reads source objects through.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::errors::PipelineError;
use log_indexer_shared::SourceObject;

/// Lazily produced chunks of an object body.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, PipelineError>>;

/// Reasons an object could not be opened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The key does not exist in the bucket.
    #[error("object not found")]
    NotFound,

    /// The caller is not allowed to read the object.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The bucket lives in a different region than the client.
    #[error("bucket is in a different region: {0}")]
    WrongRegion(String),

    /// Any other failure reported by the backend.
    #[error("{0}")]
    Other(String),
}

/// Abstract interface for reading objects.
///
/// Implementations return as soon as the object is known to exist; the body
/// is read incrementally as the returned stream is polled.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Open the object for streaming.
    ///
    /// # Returns
    ///
    /// * `Ok(ByteStream)` - The object body, chunk by chunk
    /// * `Err(StorageError)` - If the object cannot be opened
    async fn get_object(&self, source: &SourceObject) -> Result<ByteStream, StorageError>;
}
