//! Settings read from the environment at startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::IndexingError;
use log_indexer_pipeline::orchestrator::OrchestratorConfig;
use log_indexer_shared::{IndexTarget, LogFormat};

/// Default signing and storage region.
const DEFAULT_REGION: &str = "us-east-1";

/// Default bound on concurrent submissions per object.
const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Default capacity of the transform-to-loader channel.
const DEFAULT_CHANNEL_BUFFER_SIZE: usize = 1000;

/// Process-wide settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Indexing endpoint; every object fails when this is absent.
    pub endpoint: Option<String>,
    pub region: String,
    pub log_format: LogFormat,
    pub index_prefix: String,
    pub doc_type: String,
    /// Sign requests with AWS SigV4.
    pub signing: bool,
    pub max_in_flight: usize,
    pub channel_buffer_size: usize,
    /// Read objects from `{root}/{bucket}/{key}` instead of S3.
    pub local_storage_root: Option<PathBuf>,
    pub json_logs: bool,
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ES_ENDPOINT`: OpenSearch endpoint, host or URL
    /// - `AWS_REGION`: region (default: us-east-1)
    /// - `LOG_TYPE`: `alb` or `cdn` (default: alb)
    /// - `INDEX_PREFIX`: index name prefix (default derived from `LOG_TYPE`)
    /// - `DOC_TYPE`: document type (default derived from `LOG_TYPE`)
    /// - `ES_SIGNING`: sign requests (default: true)
    /// - `MAX_IN_FLIGHT`: concurrent submissions per object (default: 64)
    /// - `CHANNEL_BUFFER_SIZE`: transform channel capacity (default: 1000)
    /// - `LOCAL_STORAGE_ROOT`: read objects from a local directory
    /// - `LOG_FORMAT_JSON`: emit JSON logs (default: false)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build settings from any variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let log_format = match get("LOG_TYPE") {
            Some(raw) => LogFormat::from_str(&raw).map_err(|e| IndexingError::config(e.to_string()))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            endpoint: get("ES_ENDPOINT"),
            region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            log_format,
            index_prefix: get("INDEX_PREFIX")
                .unwrap_or_else(|| log_format.default_index_prefix().to_string()),
            doc_type: get("DOC_TYPE")
                .unwrap_or_else(|| log_format.default_doc_type().to_string()),
            signing: parse_flag("ES_SIGNING", get("ES_SIGNING"), true)?,
            max_in_flight: parse_count("MAX_IN_FLIGHT", get("MAX_IN_FLIGHT"), DEFAULT_MAX_IN_FLIGHT)?,
            channel_buffer_size: parse_count(
                "CHANNEL_BUFFER_SIZE",
                get("CHANNEL_BUFFER_SIZE"),
                DEFAULT_CHANNEL_BUFFER_SIZE,
            )?,
            local_storage_root: get("LOCAL_STORAGE_ROOT").map(PathBuf::from),
            json_logs: parse_flag("LOG_FORMAT_JSON", get("LOG_FORMAT_JSON"), false)?,
        })
    }

    /// Destination for documents indexed on `date`.
    pub fn index_target(&self, date: NaiveDate) -> IndexTarget {
        IndexTarget::dated(&self.index_prefix, self.doc_type.clone(), date)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            channel_buffer_size: self.channel_buffer_size,
            max_in_flight: self.max_in_flight,
            endpoint: self.endpoint.clone(),
            region: Some(self.region.clone()),
        }
    }
}

fn parse_flag(name: &str, raw: Option<String>, default: bool) -> Result<bool, IndexingError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(IndexingError::config(format!(
            "{} must be true or false, got {:?}",
            name, raw
        ))),
    }
}

fn parse_count(name: &str, raw: Option<String>, default: usize) -> Result<usize, IndexingError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(IndexingError::config(format!(
            "{} must be a positive integer, got {:?}",
            name, raw
        ))),
    }
}
