//! Search engine client trait definition.
//!
//! This module defines the abstract interface the delivery sink submits
//! documents through, allowing for different backend implementations
//! (signed OpenSearch, plain OpenSearch, test doubles).

use async_trait::async_trait;

use crate::errors::SearchError;
use log_indexer_shared::IndexTarget;

/// Acknowledgement returned by the endpoint for one indexed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body, kept verbatim for logging.
    pub body: String,
}

impl IndexResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Abstract interface for submitting documents to a search engine.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: one client is shared by every
/// in-flight submission of every source object in the process.
///
/// # Error Handling
///
/// A non-success HTTP status is an error (`SearchError::IndexError`), so
/// callers only need to distinguish `Ok` from `Err`.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Index a single serialized JSON document.
    ///
    /// Issues `POST /{index}/{doctype}` with `Content-Type: application/json`.
    ///
    /// # Arguments
    ///
    /// * `target` - The index and document type to post to
    /// * `body` - One serialized record
    ///
    /// # Returns
    ///
    /// * `Ok(IndexResponse)` - The endpoint acknowledged the document
    /// * `Err(SearchError)` - Transport failure or non-success response
    async fn index_document(
        &self,
        target: &IndexTarget,
        body: String,
    ) -> Result<IndexResponse, SearchError>;

    /// Check if the search engine is reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the endpoint answered with a success status
    /// * `Ok(false)` - If it answered with any other status
    /// * `Err(SearchError)` - If the request could not be made
    async fn health_check(&self) -> Result<bool, SearchError>;
}
