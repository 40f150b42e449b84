//! Search error types.
//!
//! This module defines the error types that can occur while talking to the
//! indexing endpoint.

use thiserror::Error;

/// Errors that can occur during search engine operations.
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    /// Failed to build the client or reach the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The endpoint rejected an indexing request.
    #[error("Index error (status {status}): {body}")]
    IndexError { status: u16, body: String },

    /// The request could not be sent or its response could not be read.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Failed to resolve signing credentials.
    #[error("Credentials error: {0}")]
    CredentialsError(String),
}

impl SearchError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index error from a non-success response.
    pub fn index(status: u16, body: impl Into<String>) -> Self {
        Self::IndexError {
            status,
            body: body.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportError(msg.into())
    }

    /// Create a credentials error.
    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::CredentialsError(msg.into())
    }
}

impl From<opensearch::Error> for SearchError {
    fn from(err: opensearch::Error) -> Self {
        Self::TransportError(err.to_string())
    }
}
