//! Identity of one compressed log object in storage.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A notification key could not be URL-decoded.
#[derive(Debug, Error)]
#[error("Invalid object key {key:?}: {reason}")]
pub struct KeyDecodeError {
    pub key: String,
    pub reason: String,
}

/// One compressed log file, identified by bucket and object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceObject {
    /// The storage container (S3 bucket).
    pub bucket: String,
    /// The decoded object key.
    pub key: String,
}

impl SourceObject {
    /// Create a source object from an already-decoded key.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Create a source object from a key as it appears in a storage event
    /// notification: form-encoded, with `+` standing for a space.
    pub fn from_event_key(
        bucket: impl Into<String>,
        raw_key: &str,
    ) -> Result<Self, KeyDecodeError> {
        let spaced = raw_key.replace('+', " ");
        let key = urlencoding::decode(&spaced).map_err(|e| KeyDecodeError {
            key: raw_key.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self::new(bucket, key.into_owned()))
    }
}

impl fmt::Display for SourceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}
