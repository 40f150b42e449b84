//! Application Load Balancer access log parser.
//!
//! Entries are space-separated; fields containing spaces are wrapped in
//! double quotes. Newer load balancers append fields at the end, so every
//! field after `request` is optional.

use chrono::DateTime;
use serde_json::Value;
use url::Url;

use crate::processor::parser::{number_value, text_value, LogParser, ParseError};
use log_indexer_shared::{LogFormat, LogRecord};

/// Fields up to and including `request` must be present.
const REQUIRED_FIELDS: usize = 13;

/// Optional trailing fields, in log order, starting at index 13.
const OPTIONAL_TEXT_FIELDS: &[&str] = &[
    "user_agent",
    "ssl_cipher",
    "ssl_protocol",
    "target_group_arn",
    "trace_id",
    "domain_name",
    "chosen_cert_arn",
    "matched_rule_priority",
    "request_creation_time",
    "actions_executed",
    "redirect_url",
    "error_reason",
    "target_port_list",
    "target_status_code_list",
    "classification",
    "classification_reason",
    "conn_trace_id",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct AlbParser;

impl AlbParser {
    pub fn new() -> Self {
        Self
    }

    /// Split a line on spaces, keeping quoted fields together.
    fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
        let mut fields = Vec::new();
        let mut chars = line.chars().peekable();

        loop {
            while chars.peek() == Some(&' ') {
                chars.next();
            }
            let Some(&first) = chars.peek() else {
                break;
            };

            let mut field = String::new();
            if first == '"' {
                chars.next();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                field.push(escaped);
                            }
                        }
                        '"' => {
                            closed = true;
                            break;
                        }
                        _ => field.push(c),
                    }
                }
                if !closed {
                    return Err(ParseError::invalid("line", "unterminated quoted field"));
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c == ' ' {
                        break;
                    }
                    field.push(c);
                    chars.next();
                }
            }
            fields.push(field);
        }

        Ok(fields)
    }

    /// `ip:port` into its two parts; `-` yields two nulls.
    fn endpoint(record: &mut LogRecord, prefix: &str, raw: &str) {
        let (ip, port) = match raw.rsplit_once(':') {
            Some((ip, port)) if raw != "-" => (text_value(ip), number_value(port)),
            _ => (text_value(raw), Value::Null),
        };
        record.insert(format!("{}_ip", prefix), ip);
        record.insert(format!("{}_port", prefix), port);
    }

    /// `METHOD URI VERSION` into its parts, and the URI into its components.
    fn request(record: &mut LogRecord, raw: &str) {
        record.insert("request".to_string(), text_value(raw));

        let mut parts = raw.split_whitespace();
        let method = parts.next().unwrap_or("-");
        let uri = parts.next().unwrap_or("-");
        let version = parts.next().unwrap_or("-");

        record.insert("request_method".to_string(), text_value(method));
        record.insert("request_uri".to_string(), text_value(uri));
        record.insert("request_http_version".to_string(), text_value(version));

        if let Ok(url) = Url::parse(uri) {
            record.insert("request_uri_scheme".to_string(), Value::from(url.scheme()));
            record.insert(
                "request_uri_host".to_string(),
                url.host_str().map(Value::from).unwrap_or(Value::Null),
            );
            record.insert(
                "request_uri_port".to_string(),
                url.port_or_known_default()
                    .map(Value::from)
                    .unwrap_or(Value::Null),
            );
            record.insert("request_uri_path".to_string(), Value::from(url.path()));
            record.insert(
                "request_uri_query".to_string(),
                url.query().map(Value::from).unwrap_or(Value::Null),
            );
        }
    }
}

impl LogParser for AlbParser {
    fn format(&self) -> LogFormat {
        LogFormat::Alb
    }

    fn parse(&self, line: &str) -> Result<LogRecord, ParseError> {
        if line.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let fields = Self::tokenize(line)?;
        if fields.len() < REQUIRED_FIELDS {
            return Err(ParseError::MissingFields {
                expected: REQUIRED_FIELDS,
                found: fields.len(),
            });
        }

        DateTime::parse_from_rfc3339(&fields[1])
            .map_err(|e| ParseError::invalid("timestamp", e.to_string()))?;

        let mut record = LogRecord::new();
        record.insert("type".to_string(), text_value(&fields[0]));
        record.insert("timestamp".to_string(), Value::from(fields[1].as_str()));
        record.insert("elb".to_string(), text_value(&fields[2]));
        Self::endpoint(&mut record, "client", &fields[3]);
        Self::endpoint(&mut record, "target", &fields[4]);

        let numeric = [
            "request_processing_time",
            "target_processing_time",
            "response_processing_time",
            "elb_status_code",
            "target_status_code",
            "received_bytes",
            "sent_bytes",
        ];
        for (name, raw) in numeric.iter().zip(&fields[5..12]) {
            record.insert(name.to_string(), number_value(raw));
        }

        Self::request(&mut record, &fields[12]);

        for (name, raw) in OPTIONAL_TEXT_FIELDS.iter().zip(&fields[REQUIRED_FIELDS..]) {
            let value = if *name == "matched_rule_priority" {
                number_value(raw)
            } else {
                text_value(raw)
            };
            record.insert(name.to_string(), value);
        }

        Ok(record)
    }
}
