//! # QuizStore Core
//!
//! Backend selection, migration, backups and health for QuizStore.
//!
//! This crate provides:
//! - [`StoreRouter`]: picks the structured or flat backend once, at `init`
//! - [`Migrator`]: one-time, flag-guarded import of legacy flat data
//! - [`BackupManager`] and [`AutoBackupPolicy`]: snapshots and retention
//! - [`HealthMonitor`]: capacity estimates and status classification
//! - [`QuizStore`]: the handle the application uses
//!
//! Storage hosts and backends live in `quizstore_storage`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backup;
mod config;
mod export;
mod health;
mod migration;
mod router;
mod stats;
mod store;

pub use backup::{
    AutoBackupPolicy, Backup, BackupManager, BackupOptions, BackupSummary, Snapshot,
    DEFAULT_SNAPSHOT_COLLECTIONS,
};
pub use config::{
    StoreConfig, DEFAULT_DB_NAME, DEFAULT_LAST_BACKUP_KEY, DEFAULT_MIGRATION_FLAG_KEY,
};
pub use export::{ExportBundle, ExportData};
pub use health::{
    classify, format_bytes, CapacitySnapshot, CollectionUsage, HealthMonitor, HealthReport,
    HealthStatus, CRITICAL_PERCENT, FLAT_WARNING_PERCENT, WARNING_PERCENT,
};
pub use migration::{
    MigrationCheck, MigrationFlag, MigrationReport, MigrationState, Migrator, SkipReason,
    SkippedSource,
};
pub use router::StoreRouter;
pub use stats::{StatsSnapshot, StoreStats};
pub use store::QuizStore;
