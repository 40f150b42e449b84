//! Record transformer implementation.
//!
//! Turns each line into exactly one JSON document. Lines the parser
//! rejects become marker documents, so every counted line is matched by
//! one submission downstream.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use serde_json::json;
use tracing::debug;

use crate::errors::PipelineError;
use crate::loader::PipelineTally;
use crate::processor::parser::LogParser;
use crate::source::LineStream;

/// Serialized documents in line order.
pub type RecordStream = BoxStream<'static, Result<String, PipelineError>>;

/// Processor that transforms raw lines into search documents.
pub struct RecordTransformer {
    parser: Arc<dyn LogParser>,
    tally: Arc<PipelineTally>,
}

impl RecordTransformer {
    /// Create a transformer counting into the given tally.
    pub fn new(parser: Arc<dyn LogParser>, tally: Arc<PipelineTally>) -> Self {
        Self { parser, tally }
    }

    /// Transform a single line.
    ///
    /// The line is counted before it is parsed.
    pub fn transform(&self, line: &str) -> String {
        let line_number = self.tally.record_line();

        let failure = match self.parser.parse(line) {
            Ok(record) => match serde_json::to_string(&record) {
                Ok(document) => return document,
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };

        self.tally.record_parse_failure();
        debug!(line_number, reason = %failure, "Line could not be parsed, emitting marker");
        self.marker(line, &failure)
    }

    fn marker(&self, line: &str, reason: &str) -> String {
        json!({
            "parse_error": reason,
            "raw_line": line,
            "log_type": self.parser.format().as_str(),
        })
        .to_string()
    }

    /// Transform a stream of lines, preserving order.
    ///
    /// Upstream errors pass through untouched and are not counted.
    pub fn transform_stream(self, lines: LineStream) -> RecordStream {
        lines
            .map(move |line| line.map(|line| self.transform(&line)))
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::parser::ParseError;
    use futures::stream;
    use log_indexer_shared::{LogFormat, LogRecord};
    use serde_json::Value;

    /// Accepts lines starting with `L`, rejects everything else.
    struct PrefixParser;

    impl LogParser for PrefixParser {
        fn format(&self) -> LogFormat {
            LogFormat::Alb
        }

        fn parse(&self, line: &str) -> Result<LogRecord, ParseError> {
            if !line.starts_with('L') {
                return Err(ParseError::invalid("line", "does not start with L"));
            }
            let mut record = LogRecord::new();
            record.insert("line".to_string(), Value::from(line));
            Ok(record)
        }
    }

    fn transformer() -> (RecordTransformer, Arc<PipelineTally>) {
        let tally = Arc::new(PipelineTally::new());
        (
            RecordTransformer::new(Arc::new(PrefixParser), tally.clone()),
            tally,
        )
    }

    fn lines(items: &[&str]) -> LineStream {
        let items: Vec<Result<String, PipelineError>> =
            items.iter().map(|l| Ok(l.to_string())).collect();
        stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn test_order_is_preserved() {
        let (transformer, tally) = transformer();

        let documents: Vec<Value> = transformer
            .transform_stream(lines(&["L1", "L2", "L3"]))
            .map(|doc| serde_json::from_str(&doc.unwrap()).unwrap())
            .collect()
            .await;

        let order: Vec<&str> = documents
            .iter()
            .map(|doc| doc["line"].as_str().unwrap())
            .collect();
        assert_eq!(order, vec!["L1", "L2", "L3"]);
        assert_eq!(tally.snapshot().total_lines, 3);
    }

    #[tokio::test]
    async fn test_parse_failure_emits_marker_and_is_counted() {
        let (transformer, tally) = transformer();

        let documents: Vec<String> = transformer
            .transform_stream(lines(&["L1", "L2", "garbage", "L4", "L5"]))
            .map(|doc| doc.unwrap())
            .collect()
            .await;

        assert_eq!(documents.len(), 5);

        let marker: Value = serde_json::from_str(&documents[2]).unwrap();
        assert_eq!(marker["raw_line"], "garbage");
        assert_eq!(marker["log_type"], "alb");
        assert!(marker["parse_error"]
            .as_str()
            .unwrap()
            .contains("does not start with L"));

        let summary = tally.snapshot();
        assert_eq!(summary.total_lines, 5);
        assert_eq!(summary.parse_failures, 1);
    }

    #[tokio::test]
    async fn test_upstream_error_passes_through_uncounted() {
        let (transformer, tally) = transformer();
        let items: Vec<Result<String, PipelineError>> = vec![
            Ok("L1".to_string()),
            Err(PipelineError::decompression("truncated gzip stream")),
        ];

        let results: Vec<_> = transformer
            .transform_stream(stream::iter(items).boxed())
            .collect()
            .await;

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(PipelineError::DecompressionError(_))));
        assert_eq!(tally.snapshot().total_lines, 1);
    }
}
