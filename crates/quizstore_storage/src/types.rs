//! Core type definitions shared by every backend.

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Id of the singleton record in `quizData` and `userProgress`.
pub const CANONICAL_ID: &str = "main";

/// Id under which application settings are stored in `settings`.
pub const SETTINGS_ID: &str = "appSettings";

/// A named namespace of records.
///
/// The set of collections is fixed at compile time; callers cannot create
/// new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Collection {
    /// The question bank.
    #[serde(rename = "quizData")]
    QuizData,
    /// Per-user answers and statistics.
    #[serde(rename = "userProgress")]
    UserProgress,
    /// Application settings.
    #[serde(rename = "settings")]
    Settings,
    /// Snapshots written by the backup manager.
    #[serde(rename = "backup")]
    Backup,
}

impl Collection {
    /// All collections, in schema creation order.
    pub const ALL: [Collection; 4] = [
        Collection::QuizData,
        Collection::UserProgress,
        Collection::Settings,
        Collection::Backup,
    ];

    /// Returns the persisted name of the collection.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Collection::QuizData => "quizData",
            Collection::UserProgress => "userProgress",
            Collection::Settings => "settings",
            Collection::Backup => "backup",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| StorageError::UnknownCollection(s.to_string()))
    }
}

/// Which backend the router selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendKind {
    /// The asynchronous structured engine.
    Structured,
    /// The synchronous flat key-value fallback.
    Flat,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Structured => f.write_str("structured"),
            BackendKind::Flat => f.write_str("flat"),
        }
    }
}

/// A host-level estimate of storage usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaEstimate {
    /// Bytes currently in use.
    pub used_bytes: u64,
    /// Bytes available to this origin in total.
    pub total_bytes: u64,
}

impl QuotaEstimate {
    /// Returns usage as a percentage, or `None` when the total is zero.
    #[must_use]
    pub fn percent_used(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            None
        } else {
            Some(self.used_bytes as f64 / self.total_bytes as f64 * 100.0)
        }
    }
}
