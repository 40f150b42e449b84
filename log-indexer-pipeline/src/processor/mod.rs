//! Processor module for the log indexer pipeline.
//!
//! Parses raw lines and serializes them into search documents.

mod alb;
mod cdn;
mod parser;
mod transformer;

pub use alb::AlbParser;
pub use cdn::CdnParser;
pub use parser::{parser_for, LogParser, ParseError};
pub use transformer::{RecordStream, RecordTransformer};
