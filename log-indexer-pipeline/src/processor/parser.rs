//! Log parser capability.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::processor::{AlbParser, CdnParser};
use log_indexer_shared::{LogFormat, LogRecord};

/// A single line could not be parsed. Never fatal for the object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line has no content.
    #[error("empty line")]
    Empty,

    /// The line is a header or comment, not a log entry.
    #[error("comment line")]
    Comment,

    /// Fewer fields than the format requires.
    #[error("expected at least {expected} fields, found {found}")]
    MissingFields { expected: usize, found: usize },

    /// A field has an invalid value or the line is malformed.
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

impl ParseError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Parses one access log line into a structured record.
pub trait LogParser: Send + Sync {
    /// The format this parser understands.
    fn format(&self) -> LogFormat;

    /// Parse a single line, without its terminator.
    fn parse(&self, line: &str) -> Result<LogRecord, ParseError>;
}

/// Parser for the given format.
pub fn parser_for(format: LogFormat) -> Arc<dyn LogParser> {
    match format {
        LogFormat::Alb => Arc::new(AlbParser::new()),
        LogFormat::Cdn => Arc::new(CdnParser::new()),
    }
}

/// `-` placeholder becomes `null`, anything else a string.
pub(crate) fn text_value(raw: &str) -> Value {
    if raw == "-" {
        Value::Null
    } else {
        Value::String(raw.to_string())
    }
}

/// `-` placeholder becomes `null`; numbers become JSON numbers; anything
/// unparseable is kept as text rather than rejected.
pub(crate) fn number_value(raw: &str) -> Value {
    if raw == "-" {
        return Value::Null;
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::from(f),
        _ => Value::String(raw.to_string()),
    }
}
