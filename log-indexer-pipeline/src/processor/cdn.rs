//! CloudFront standard access log parser.
//!
//! Entries are tab-separated. Files start with `#Version` and `#Fields`
//! header lines, which are reported as comments.

use chrono::{NaiveDateTime, SecondsFormat};
use serde_json::Value;

use crate::processor::parser::{number_value, text_value, LogParser, ParseError};
use log_indexer_shared::{LogFormat, LogRecord};

/// Columns in log order, with whether the value is numeric.
const COLUMNS: &[(&str, bool)] = &[
    ("date", false),
    ("time", false),
    ("edge_location", false),
    ("sc_bytes", true),
    ("client_ip", false),
    ("method", false),
    ("host", false),
    ("uri_stem", false),
    ("status", true),
    ("referer", false),
    ("user_agent", false),
    ("uri_query", false),
    ("cookie", false),
    ("edge_result_type", false),
    ("edge_request_id", false),
    ("host_header", false),
    ("protocol", false),
    ("cs_bytes", true),
    ("time_taken", true),
    ("forwarded_for", false),
    ("ssl_protocol", false),
    ("ssl_cipher", false),
    ("edge_response_result_type", false),
    ("protocol_version", false),
    ("fle_status", false),
    ("fle_encrypted_fields", false),
    ("client_port", true),
    ("time_to_first_byte", true),
    ("edge_detailed_result_type", false),
    ("content_type", false),
    ("content_len", true),
    ("range_start", true),
    ("range_end", true),
];

/// Fields up to and including `uri_query` must be present.
const REQUIRED_FIELDS: usize = 12;

#[derive(Debug, Default, Clone, Copy)]
pub struct CdnParser;

impl CdnParser {
    pub fn new() -> Self {
        Self
    }

    fn timestamp(date: &str, time: &str) -> Result<String, ParseError> {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M:%S")
            .map(|dt| dt.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true))
            .map_err(|e| ParseError::invalid("timestamp", e.to_string()))
    }
}

impl LogParser for CdnParser {
    fn format(&self) -> LogFormat {
        LogFormat::Cdn
    }

    fn parse(&self, line: &str) -> Result<LogRecord, ParseError> {
        if line.trim().is_empty() {
            return Err(ParseError::Empty);
        }
        if line.starts_with('#') {
            return Err(ParseError::Comment);
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < REQUIRED_FIELDS {
            return Err(ParseError::MissingFields {
                expected: REQUIRED_FIELDS,
                found: fields.len(),
            });
        }

        let mut record = LogRecord::new();
        record.insert(
            "timestamp".to_string(),
            Value::from(Self::timestamp(fields[0], fields[1])?),
        );

        for ((name, numeric), raw) in COLUMNS.iter().zip(&fields) {
            let value = if *numeric {
                number_value(raw)
            } else {
                text_value(raw)
            };
            record.insert(name.to_string(), value);
        }

        Ok(record)
    }
}
