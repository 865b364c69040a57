//! Capacity estimation and health classification.
//!
//! Classification is a pure function of a [`CapacitySnapshot`]:
//!
//! | Backend | Usage | Status |
//! |---------|-------|--------|
//! | flat | any | `limited` |
//! | structured | < 75% or unknown | `good` |
//! | structured | 75% to < 90% | `warning` |
//! | structured | >= 90% | `critical` |
//!
//! `error` is reserved for a snapshot that could not be taken.

use crate::router::StoreRouter;
use quizstore_storage::{BackendKind, Collection, StorageError, StorageResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Usage at or above this percentage is a warning.
pub const WARNING_PERCENT: f64 = 75.0;

/// Usage at or above this percentage is critical.
pub const CRITICAL_PERCENT: f64 = 90.0;

/// Flat usage above this percentage adds a warning.
pub const FLAT_WARNING_PERCENT: f64 = 80.0;

/// Formats a byte count in base-1024 units, e.g. `"1.5 KB"`.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// Records and bytes held by one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionUsage {
    /// Number of readable records.
    pub item_count: usize,
    /// Sum of the records' serialized lengths.
    pub estimated_bytes: u64,
}

/// A point-in-time estimate of storage usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacitySnapshot {
    /// Backend the estimate was taken from.
    pub backend: BackendKind,
    /// Bytes in use.
    pub used_bytes: u64,
    /// Bytes available in total, when the host reports it.
    pub total_bytes: Option<u64>,
    /// `used_bytes` as a percentage of `total_bytes`.
    pub percent_used: Option<f64>,
    /// Usage by collection name.
    pub per_collection: BTreeMap<String, CollectionUsage>,
}

/// Overall storage health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Plenty of room.
    Good,
    /// Usage is high.
    Warning,
    /// Storage is nearly full.
    Critical,
    /// Running on the constrained flat backend.
    Limited,
    /// Usage could not be determined.
    Error,
}

impl HealthStatus {
    /// Returns the lowercase status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Limited => "limited",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified health result. Messages are informational only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    /// Overall status.
    pub status: HealthStatus,
    /// Problems found.
    pub warnings: Vec<String>,
    /// Suggested remedies.
    pub recommendations: Vec<String>,
}

impl HealthReport {
    fn new(status: HealthStatus) -> Self {
        Self {
            status,
            warnings: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// Classifies a snapshot. Has no side effects.
#[must_use]
pub fn classify(snapshot: &CapacitySnapshot) -> HealthReport {
    if snapshot.backend == BackendKind::Flat {
        let mut report = HealthReport::new(HealthStatus::Limited);
        report
            .warnings
            .push("Using flat fallback storage, capacity is limited".to_string());
        report
            .recommendations
            .push("Use a host with structured storage for more capacity".to_string());
        if let Some(percent) = snapshot.percent_used {
            if percent > FLAT_WARNING_PERCENT {
                report
                    .warnings
                    .push(format!("Flat storage usage is high ({percent:.1}%)"));
            }
        }
        return report;
    }

    let Some(percent) = snapshot.percent_used else {
        let mut report = HealthReport::new(HealthStatus::Good);
        report
            .warnings
            .push("Unable to determine storage usage percentage".to_string());
        return report;
    };

    if percent >= CRITICAL_PERCENT {
        let mut report = HealthReport::new(HealthStatus::Critical);
        report
            .warnings
            .push(format!("Storage usage is above 90% ({percent:.1}%)"));
        report.recommendations.push(
            "Clean up old backups or export data now to free space".to_string(),
        );
        report
    } else if percent >= WARNING_PERCENT {
        let mut report = HealthReport::new(HealthStatus::Warning);
        report
            .warnings
            .push(format!("Storage usage is above 75% ({percent:.1}%)"));
        report
            .recommendations
            .push("Consider cleaning up old backups or exporting data".to_string());
        report
    } else {
        HealthReport::new(HealthStatus::Good)
    }
}

/// Computes capacity snapshots and health reports for a router.
pub struct HealthMonitor<'a> {
    router: &'a StoreRouter,
}

impl<'a> HealthMonitor<'a> {
    /// Creates a monitor over `router`.
    pub fn new(router: &'a StoreRouter) -> Self {
        Self { router }
    }

    /// Estimates current usage.
    ///
    /// Uses the host's estimate when it has one; otherwise usage is the sum
    /// of the collections' record sizes and the total is unknown.
    ///
    /// # Errors
    ///
    /// `NotInitialized` before `init`, or the backend's error.
    pub async fn capacity_snapshot(&self) -> StorageResult<CapacitySnapshot> {
        let backend = self
            .router
            .backend_kind()
            .ok_or(StorageError::NotInitialized)?;

        let mut per_collection = BTreeMap::new();
        for collection in Collection::ALL {
            let records = self.router.list_all(collection).await?;
            let usage = CollectionUsage {
                item_count: records.len(),
                estimated_bytes: records.iter().map(|r| r.encoded_size() as u64).sum(),
            };
            per_collection.insert(collection.as_str().to_string(), usage);
        }

        let estimate = self.router.estimate().await?;
        let used_bytes = match estimate {
            Some(estimate) => estimate.used_bytes,
            None => per_collection.values().map(|u| u.estimated_bytes).sum(),
        };

        Ok(CapacitySnapshot {
            backend,
            used_bytes,
            total_bytes: estimate.map(|e| e.total_bytes),
            percent_used: estimate.and_then(|e| e.percent_used()),
            per_collection,
        })
    }

    /// Classifies current usage. Never fails: a snapshot error becomes
    /// [`HealthStatus::Error`].
    pub async fn health_status(&self) -> HealthReport {
        match self.capacity_snapshot().await {
            Ok(snapshot) => classify(&snapshot),
            Err(e) => {
                warn!(error = %e, "failed to read storage usage");
                let mut report = HealthReport::new(HealthStatus::Error);
                report
                    .warnings
                    .push(format!("Failed to read storage usage: {e}"));
                report
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use quizstore_storage::{MemoryFlatHost, MemoryStructuredHost};
    use serde_json::json;
    use std::sync::Arc;

    fn snapshot(backend: BackendKind, percent: Option<f64>) -> CapacitySnapshot {
        CapacitySnapshot {
            backend,
            used_bytes: 0,
            total_bytes: percent.map(|_| 100),
            percent_used: percent,
            per_collection: BTreeMap::new(),
        }
    }

    #[test]
    fn classify_thresholds() {
        let status = |p| classify(&snapshot(BackendKind::Structured, Some(p))).status;
        assert_eq!(status(0.0), HealthStatus::Good);
        assert_eq!(status(74.9), HealthStatus::Good);
        assert_eq!(status(75.0), HealthStatus::Warning);
        assert_eq!(status(89.9), HealthStatus::Warning);
        assert_eq!(status(90.0), HealthStatus::Critical);
        assert_eq!(status(100.0), HealthStatus::Critical);
    }

    #[test]
    fn flat_is_always_limited() {
        let low = classify(&snapshot(BackendKind::Flat, Some(1.0)));
        assert_eq!(low.status, HealthStatus::Limited);
        assert_eq!(low.warnings.len(), 1);

        let high = classify(&snapshot(BackendKind::Flat, Some(95.0)));
        assert_eq!(high.status, HealthStatus::Limited);
        assert_eq!(high.warnings.len(), 2);
    }

    #[test]
    fn unknown_percentage_is_good_with_warning() {
        let report = classify(&snapshot(BackendKind::Structured, None));
        assert_eq!(report.status, HealthStatus::Good);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(HealthStatus::Limited).unwrap(),
            json!("limited")
        );
        assert_eq!(HealthStatus::Critical.to_string(), "critical");
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_bytes(1_234_567), "1.18 MB");
    }

    #[tokio::test]
    async fn structured_snapshot_uses_host_estimate() {
        let structured = Arc::new(MemoryStructuredHost::new());
        structured.set_estimate_total(Some(1000));
        let router = StoreRouter::new(
            Arc::new(MemoryFlatHost::new()),
            Some(structured),
            StoreConfig::default(),
        );
        router.init().await.unwrap();
        router
            .set(Collection::QuizData, "main", json!({"q": [1, 2]}))
            .await
            .unwrap();

        let snap = HealthMonitor::new(&router).capacity_snapshot().await.unwrap();
        assert_eq!(snap.backend, BackendKind::Structured);
        assert_eq!(snap.total_bytes, Some(1000));
        assert!(snap.used_bytes > 0);
        assert!(snap.percent_used.is_some());
        assert_eq!(snap.per_collection["quizData"].item_count, 1);
        assert_eq!(snap.per_collection["backup"].item_count, 0);
    }

    #[tokio::test]
    async fn flat_snapshot_is_limited() {
        let router = StoreRouter::new(
            Arc::new(MemoryFlatHost::new()),
            None,
            StoreConfig::default(),
        );
        router.init().await.unwrap();
        router
            .set(Collection::UserProgress, "main", json!([1]))
            .await
            .unwrap();

        let monitor = HealthMonitor::new(&router);
        let snap = monitor.capacity_snapshot().await.unwrap();
        assert_eq!(snap.total_bytes, Some(5 * 1024 * 1024));
        assert_eq!(snap.per_collection["userProgress"].item_count, 1);
        assert_eq!(monitor.health_status().await.status, HealthStatus::Limited);
    }

    #[tokio::test]
    async fn uninitialized_router_reports_error() {
        let router = StoreRouter::new(
            Arc::new(MemoryFlatHost::new()),
            None,
            StoreConfig::default(),
        );
        let report = HealthMonitor::new(&router).health_status().await;
        assert_eq!(report.status, HealthStatus::Error);
        assert_eq!(report.warnings.len(), 1);
    }
}
