//! Source module for the log indexer pipeline.
//!
//! Opens objects in storage and turns their compressed bodies into a lazy
//! stream of text lines.

mod decompress;
mod lines;
mod local;
mod s3;
mod storage;

pub use decompress::{gunzip, GzipStreamDecoder};
pub use lines::{split_lines, LineSplitter, LineStream};
pub use local::{LocalObjectStore, MemoryObjectStore};
pub use s3::S3ObjectStore;
pub use storage::{ByteStream, ObjectStore, StorageError};
