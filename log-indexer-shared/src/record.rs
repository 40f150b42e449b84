//! Structured representation of one parsed log line.

use serde_json::{Map, Value};

/// Field name to value mapping produced by a log parser.
pub type LogRecord = Map<String, Value>;
