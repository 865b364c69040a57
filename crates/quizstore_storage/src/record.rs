//! The unit of persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema version recorded on records decoded from legacy flat keys.
pub const LEGACY_SCHEMA_VERSION: &str = "legacy";

/// One stored record: an id, an opaque payload and write metadata.
///
/// The storage layer never looks inside `payload`. Writes are full
/// replacements, so at most one live record exists per (collection, id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Logical key, unique within its collection.
    pub id: String,
    /// Caller-supplied data.
    pub payload: Value,
    /// When the storage layer last wrote this record.
    pub written_at: DateTime<Utc>,
    /// Application version at write time. Informational only.
    pub schema_version: String,
}

impl Record {
    /// Creates a record stamped with the current time.
    pub fn new(id: impl Into<String>, payload: Value, schema_version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload,
            written_at: Utc::now(),
            schema_version: schema_version.into(),
        }
    }

    /// Wraps a payload found under a legacy flat key.
    ///
    /// Legacy values carry no metadata, so the write time is the Unix epoch.
    pub fn legacy(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            payload,
            written_at: DateTime::<Utc>::UNIX_EPOCH,
            schema_version: LEGACY_SCHEMA_VERSION.to_string(),
        }
    }

    /// Returns true if this record was decoded from a legacy flat key.
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        self.schema_version == LEGACY_SCHEMA_VERSION
    }

    /// Returns the length of the record's JSON encoding.
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }
}
