//! S3 event notification decoding.

use serde::Deserialize;
use tracing::warn;

use crate::IndexingError;
use log_indexer_shared::SourceObject;

#[derive(Debug, Deserialize)]
struct S3Event {
    #[serde(rename = "Records", default)]
    records: Vec<S3EventRecord>,
}

#[derive(Debug, Deserialize)]
struct S3EventRecord {
    #[serde(rename = "eventName", default)]
    event_name: Option<String>,
    s3: Option<S3Entity>,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
}

/// A record whose object key could not be decoded.
///
/// `source` carries the key exactly as it appeared in the notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub source: SourceObject,
    pub reason: String,
}

/// One batch element: a decoded object or the record that failed to decode.
pub type EventEntry = Result<SourceObject, RejectedRecord>;

/// Decode the objects named by a notification document, in record order.
///
/// Records without an `s3` section are skipped. A key that fails to decode
/// only rejects its own record.
pub fn parse_event(document: &str) -> Result<Vec<EventEntry>, IndexingError> {
    let event: S3Event = serde_json::from_str(document)
        .map_err(|e| IndexingError::event(format!("invalid notification document: {}", e)))?;

    let mut entries = Vec::with_capacity(event.records.len());
    for record in event.records {
        let Some(s3) = record.s3 else {
            warn!(event_name = ?record.event_name, "Skipping record without s3 section");
            continue;
        };
        let entry = SourceObject::from_event_key(s3.bucket.name.clone(), &s3.object.key)
            .map_err(|e| {
                warn!(bucket = %s3.bucket.name, key = %s3.object.key, error = %e, "Rejecting record");
                RejectedRecord {
                    source: SourceObject::new(s3.bucket.name, s3.object.key),
                    reason: e.to_string(),
                }
            });
        entries.push(entry);
    }

    Ok(entries)
}
