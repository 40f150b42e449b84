//! # Log Indexer Repository
//!
//! This crate provides the trait and implementation used to deliver
//! documents to the search engine. It includes definitions for errors,
//! the client interface, and a concrete implementation for OpenSearch
//! that signs requests with AWS SigV4.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;

pub use config::SearchEngineConfig;
pub use errors::SearchError;
pub use interfaces::{IndexResponse, SearchEngineClient};
pub use opensearch::OpenSearchClient;
