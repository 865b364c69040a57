//! The public store handle.

use crate::backup::{AutoBackupPolicy, Backup, BackupManager, BackupOptions, BackupSummary};
use crate::config::StoreConfig;
use crate::export::{ExportBundle, ExportData};
use crate::health::{CapacitySnapshot, HealthMonitor, HealthReport};
use crate::migration::{MigrationFlag, MigrationReport};
use crate::router::StoreRouter;
use crate::stats::StatsSnapshot;
use chrono::{DateTime, Utc};
use quizstore_storage::{
    BackendKind, Collection, FlatHost, Record, StorageError, StorageResult, StructuredHost,
    CANONICAL_ID, SETTINGS_ID,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// The persistent store used by the application.
///
/// Construct once, call [`init`](Self::init) once, then share the handle.
/// Every operation except `init` fails with `NotInitialized` until `init`
/// has completed.
///
/// # Example
///
/// ```rust
/// use quizstore_core::{QuizStore, StoreConfig};
/// use quizstore_storage::{Collection, MemoryFlatHost, MemoryStructuredHost};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = QuizStore::new(
///     Arc::new(MemoryFlatHost::new()),
///     Some(Arc::new(MemoryStructuredHost::new())),
///     StoreConfig::default(),
/// );
/// store.init().await.unwrap();
///
/// store
///     .set(Collection::QuizData, "main", serde_json::json!({"a": 1}))
///     .await
///     .unwrap();
/// let id = store.create_backup(Some("snap1")).await.unwrap();
/// assert_eq!(id, "snap1");
/// # }
/// ```
pub struct QuizStore {
    router: Arc<StoreRouter>,
    backups: BackupManager,
    auto_backup: AutoBackupPolicy,
}

impl QuizStore {
    /// Creates a store over the given hosts.
    ///
    /// Without a structured host the store always runs on flat storage.
    pub fn new(
        flat_host: Arc<dyn FlatHost>,
        structured_host: Option<Arc<dyn StructuredHost>>,
        config: StoreConfig,
    ) -> Self {
        let router = Arc::new(StoreRouter::new(flat_host, structured_host, config));
        Self {
            backups: BackupManager::new(Arc::clone(&router)),
            auto_backup: AutoBackupPolicy::new(Arc::clone(&router)),
            router,
        }
    }

    /// Selects a backend and runs the one-time legacy migration.
    pub async fn init(&self) -> StorageResult<()> {
        self.router.init().await
    }

    /// Returns true once `init` has completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.router.is_initialized()
    }

    /// Returns the selected backend, or `None` before `init`.
    #[must_use]
    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.router.backend_kind()
    }

    /// Returns why flat storage was selected, if it was.
    #[must_use]
    pub fn fallback_reason(&self) -> Option<&str> {
        self.router.fallback_reason()
    }

    /// Returns what the migration did during `init`.
    #[must_use]
    pub fn migration_report(&self) -> Option<&MigrationReport> {
        self.router.migration_report()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        self.router.config()
    }

    /// Returns the operation counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.router.stats().snapshot()
    }

    // Records

    /// Reads one record's payload. `None` if absent.
    pub async fn get(&self, collection: Collection, id: &str) -> StorageResult<Option<Value>> {
        self.router.get(collection, id).await
    }

    /// Writes or replaces one record.
    pub async fn set(&self, collection: Collection, id: &str, value: Value) -> StorageResult<()> {
        self.router.set(collection, id, value).await
    }

    /// Deletes one record. Returns whether it existed.
    pub async fn remove(&self, collection: Collection, id: &str) -> StorageResult<bool> {
        self.router.remove(collection, id).await
    }

    /// Returns every readable record of a collection.
    pub async fn list_all(&self, collection: Collection) -> StorageResult<Vec<Record>> {
        self.router.list_all(collection).await
    }

    // Backups

    /// Backs up the live question bank and progress.
    pub async fn create_backup(&self, name: Option<&str>) -> StorageResult<String> {
        self.backups.create_backup(name).await
    }

    /// Creates a backup from explicit options.
    pub async fn create_backup_with(&self, options: BackupOptions) -> StorageResult<String> {
        self.backups.create(options).await
    }

    /// Reads one backup.
    pub async fn get_backup(&self, id: &str) -> StorageResult<Option<Backup>> {
        self.backups.get_backup(id).await
    }

    /// Lists backups newest first. Read failures yield an empty list.
    pub async fn list_backups(&self) -> Vec<BackupSummary> {
        self.backups.list_backups().await
    }

    /// Lists backups newest first.
    pub async fn try_list_backups(&self) -> StorageResult<Vec<BackupSummary>> {
        self.backups.try_list_backups().await
    }

    /// Restores live data from a backup.
    pub async fn restore_backup(&self, id: &str) -> StorageResult<()> {
        self.backups.restore_backup(id).await
    }

    /// Deletes one backup.
    pub async fn delete_backup(&self, id: &str) -> StorageResult<bool> {
        self.backups.delete_backup(id).await
    }

    /// Deletes all but the `keep_count` newest backups.
    pub async fn cleanup_backups(&self, keep_count: usize) -> StorageResult<usize> {
        self.backups.cleanup(keep_count).await
    }

    /// Creates a daily automatic backup if one is due at `now`.
    pub async fn auto_backup(&self, now: DateTime<Utc>) -> StorageResult<Option<String>> {
        self.auto_backup.maybe_backup(now).await
    }

    // Health

    /// Estimates current storage usage.
    pub async fn capacity_snapshot(&self) -> StorageResult<CapacitySnapshot> {
        HealthMonitor::new(&self.router).capacity_snapshot().await
    }

    /// Classifies storage health.
    pub async fn health_status(&self) -> HealthReport {
        HealthMonitor::new(&self.router).health_status().await
    }

    // Maintenance

    /// Exports the canonical records.
    pub async fn export_all(&self) -> StorageResult<ExportBundle> {
        let storage_type = self.backend_kind().ok_or(StorageError::NotInitialized)?;
        Ok(ExportBundle {
            version: self.config().schema_version.clone(),
            exported_at: Utc::now(),
            storage_type,
            data: ExportData {
                quiz_data: self.payload_or_null(Collection::QuizData, CANONICAL_ID).await?,
                user_progress: self
                    .payload_or_null(Collection::UserProgress, CANONICAL_ID)
                    .await?,
                settings: self.payload_or_null(Collection::Settings, SETTINGS_ID).await?,
            },
        })
    }

    async fn payload_or_null(&self, collection: Collection, id: &str) -> StorageResult<Value> {
        Ok(self.router.get(collection, id).await?.unwrap_or(Value::Null))
    }

    /// Removes all data, including legacy keys, and clears the migration
    /// flag.
    pub async fn hard_reset(&self) -> StorageResult<()> {
        let mut removed = 0;
        for collection in Collection::ALL {
            removed += self.router.clear(collection).await?;
        }

        let config = self.config();
        let host = self.router.flat_host();
        host.remove_item(&config.flat.quiz_data_key)?;
        host.remove_item(&config.flat.user_progress_key)?;
        host.remove_item(&config.last_backup_key)?;
        MigrationFlag::new(Arc::clone(host), config.migration_flag_key.clone()).clear()?;

        info!(removed, "store reset");
        Ok(())
    }
}
