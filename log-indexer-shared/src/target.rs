//! Destination of indexing requests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date pattern appended to the index prefix, one index per UTC day.
const INDEX_DATE_FORMAT: &str = "%Y.%m.%d";

/// A resolved destination: index name and document type.
///
/// Resolved once per process and never recomputed, so records processed
/// across midnight still land in the index chosen at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexTarget {
    pub index_name: String,
    pub doc_type: String,
}

impl IndexTarget {
    /// Create a target with an explicit index name.
    pub fn new(index_name: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            doc_type: doc_type.into(),
        }
    }

    /// Create a target whose index name is `{prefix}-{YYYY.MM.DD}`.
    pub fn dated(prefix: &str, doc_type: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(
            format!("{}-{}", prefix, date.format(INDEX_DATE_FORMAT)),
            doc_type,
        )
    }

    /// Request path for indexing one document: `/{index}/{doctype}`.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.index_name, self.doc_type)
    }

    /// Whether both components are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.index_name.trim().is_empty() && !self.doc_type.trim().is_empty()
    }
}

impl fmt::Display for IndexTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
