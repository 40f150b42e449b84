//! # Log Indexer Pipeline
//!
//! This crate provides the streaming pipeline that turns one compressed
//! access log object into acknowledged search documents.
//!
//! ## Architecture
//!
//! The pipeline follows the Source-Processor-Loader pattern:
//!
//! 1. **Source**: Reads the object from storage, decompresses and splits it into lines
//! 2. **Processor**: Parses each line and serializes it into a JSON document
//! 3. **Loader**: Submits documents concurrently and tracks their completion
//! 4. **Orchestrator**: Wires the stages per object and reports each outcome once

pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod processor;
pub mod source;

pub use errors::PipelineError;
