//! Portable export of the canonical records.

use chrono::{DateTime, Utc};
use quizstore_storage::BackendKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The exported records. Absent records are `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    /// `quizData/main`.
    pub quiz_data: Value,
    /// `userProgress/main`.
    pub user_progress: Value,
    /// `settings/appSettings`.
    pub settings: Value,
}

/// Everything a user needs to move their data to another installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    /// Application version that produced the export.
    pub version: String,
    /// When the export was taken.
    pub exported_at: DateTime<Utc>,
    /// Backend the data was read from.
    pub storage_type: BackendKind,
    /// The exported records.
    pub data: ExportData,
}

impl ExportBundle {
    /// Serializes the bundle as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
