//! Supported access log formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The configured format name is not one of `alb` or `cdn`.
#[derive(Debug, Error)]
#[error("Unknown log format {0:?} (expected \"alb\" or \"cdn\")")]
pub struct UnknownLogFormat(pub String);

/// Access log grammar, selecting the parser and index defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Application Load Balancer access logs.
    #[default]
    Alb,
    /// CloudFront standard access logs.
    Cdn,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Alb => "alb",
            LogFormat::Cdn => "cdn",
        }
    }

    /// Index prefix used when none is configured.
    pub fn default_index_prefix(&self) -> &'static str {
        match self {
            LogFormat::Alb => "alblogs",
            LogFormat::Cdn => "cdnlogs",
        }
    }

    /// Document type used when none is configured.
    pub fn default_doc_type(&self) -> &'static str {
        match self {
            LogFormat::Alb => "alb-access-logs",
            LogFormat::Cdn => "cdn-access-logs",
        }
    }
}

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alb" => Ok(LogFormat::Alb),
            "cdn" => Ok(LogFormat::Cdn),
            _ => Err(UnknownLogFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
