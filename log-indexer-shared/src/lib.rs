//! # Log Indexer Shared
//!
//! Value types shared by the repository, pipeline and binary crates:
//! the object being processed, the index it is delivered to, the log
//! format selector and the structured record produced by parsers.

mod format;
mod record;
mod source;
mod target;

pub use format::{LogFormat, UnknownLogFormat};
pub use record::LogRecord;
pub use source::{KeyDecodeError, SourceObject};
pub use target::IndexTarget;
