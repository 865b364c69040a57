//! Backend selection and the uniform record contract.
//!
//! The router owns which backend is in use. [`StoreRouter::init`] opens the
//! structured backend, falling back to flat storage when the host cannot
//! provide one, and runs the legacy migration once. After that the choice is
//! fixed for the life of the router: a structured failure is reported to the
//! caller, never retried against flat storage.

use crate::config::StoreConfig;
use crate::migration::{MigrationReport, Migrator};
use crate::stats::StoreStats;
use quizstore_storage::{
    BackendKind, Collection, FlatBackend, FlatHost, QuotaEstimate, Record, StorageBackend,
    StorageError, StorageResult, StructuredBackend, StructuredHost,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

struct Selected {
    backend: Box<dyn StorageBackend>,
    fallback_reason: Option<String>,
    migration: Option<MigrationReport>,
}

/// Routes record operations to the selected backend.
pub struct StoreRouter {
    config: StoreConfig,
    flat_host: Arc<dyn FlatHost>,
    structured_host: Option<Arc<dyn StructuredHost>>,
    selected: OnceCell<Selected>,
    stats: StoreStats,
}

impl StoreRouter {
    /// Creates an uninitialized router.
    ///
    /// Without a `structured_host` the router always selects flat storage.
    pub fn new(
        flat_host: Arc<dyn FlatHost>,
        structured_host: Option<Arc<dyn StructuredHost>>,
        config: StoreConfig,
    ) -> Self {
        Self {
            config,
            flat_host,
            structured_host,
            selected: OnceCell::new(),
            stats: StoreStats::new(),
        }
    }

    /// Selects a backend and runs the legacy migration.
    ///
    /// Concurrent and repeated calls share the first initialization.
    /// Backend unavailability is recovered by selecting flat storage and
    /// a failed migration is logged and retried on the next start, so this
    /// does not fail in practice.
    pub async fn init(&self) -> StorageResult<()> {
        self.selected.get_or_init(|| self.select()).await;
        Ok(())
    }

    async fn select(&self) -> Selected {
        let Some(host) = self.structured_host.clone() else {
            return self.flat("no structured host configured".to_string());
        };

        let backend =
            match StructuredBackend::open(host, &self.config.db_name, self.config.db_version).await
            {
                Ok(backend) => backend,
                Err(e) => {
                    warn!(error = %e, "structured storage unavailable, using flat storage");
                    return self.flat(e.to_string());
                }
            };

        info!(db_name = %self.config.db_name, "using structured storage");
        let mut migrator = Migrator::new(Arc::clone(&self.flat_host), &self.config);
        let migration = match migrator.run(&backend).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "legacy migration failed, will retry on next start");
                None
            }
        };

        Selected {
            backend: Box::new(backend),
            fallback_reason: None,
            migration,
        }
    }

    fn flat(&self, reason: String) -> Selected {
        info!(%reason, "using flat storage");
        let backend = FlatBackend::new(Arc::clone(&self.flat_host), self.config.flat.clone());
        Selected {
            backend: Box::new(backend),
            fallback_reason: Some(reason),
            migration: None,
        }
    }

    fn selected(&self) -> StorageResult<&Selected> {
        self.selected.get().ok_or(StorageError::NotInitialized)
    }

    fn backend(&self) -> StorageResult<&dyn StorageBackend> {
        Ok(self.selected()?.backend.as_ref())
    }

    fn require_id(collection: Collection, id: &str) -> StorageResult<()> {
        if id.is_empty() {
            return Err(StorageError::InvalidId {
                collection: collection.to_string(),
            });
        }
        Ok(())
    }

    fn track<T>(&self, result: StorageResult<T>) -> StorageResult<T> {
        if let Err(e) = &result {
            if e.is_quota_exceeded() {
                self.stats.record_quota_rejection();
            }
            self.stats.record_error();
        }
        result
    }

    /// Returns true once `init` has completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.selected.initialized()
    }

    /// Returns the selected backend, or `None` before `init`.
    #[must_use]
    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.selected.get().map(|s| s.backend.kind())
    }

    /// Returns why flat storage was selected, if it was.
    #[must_use]
    pub fn fallback_reason(&self) -> Option<&str> {
        self.selected.get()?.fallback_reason.as_deref()
    }

    /// Returns the report of the migration run during `init`.
    ///
    /// `None` before `init`, on flat storage, or when migration failed.
    #[must_use]
    pub fn migration_report(&self) -> Option<&MigrationReport> {
        self.selected.get()?.migration.as_ref()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the flat host. It holds the flags kept outside collections.
    #[must_use]
    pub fn flat_host(&self) -> &Arc<dyn FlatHost> {
        &self.flat_host
    }

    /// Returns the operation counters.
    #[must_use]
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Reads the payload of one record.
    ///
    /// # Errors
    ///
    /// `NotInitialized` before `init`, `InvalidId` for an empty id, or the
    /// backend's error.
    pub async fn get(&self, collection: Collection, id: &str) -> StorageResult<Option<Value>> {
        Self::require_id(collection, id)?;
        let backend = self.backend()?;
        let record = self.track(backend.get(collection, id).await)?;
        let size = record.as_ref().map_or(0, Record::encoded_size);
        self.stats.record_read(size as u64);
        Ok(record.map(|r| r.payload))
    }

    /// Writes or replaces one record, stamping the current time.
    ///
    /// # Errors
    ///
    /// `QuotaExceeded` when the backend refuses the write for size; the
    /// caller decides how to free space.
    pub async fn set(&self, collection: Collection, id: &str, payload: Value) -> StorageResult<()> {
        Self::require_id(collection, id)?;
        let backend = self.backend()?;
        let record = Record::new(id, payload, self.config.schema_version.as_str());
        let size = record.encoded_size();
        self.track(backend.put(collection, record).await)?;
        self.stats.record_write(size as u64);
        Ok(())
    }

    /// Deletes one record. Returns whether it existed.
    pub async fn remove(&self, collection: Collection, id: &str) -> StorageResult<bool> {
        Self::require_id(collection, id)?;
        let backend = self.backend()?;
        let removed = self.track(backend.delete(collection, id).await)?;
        if removed {
            self.stats.record_delete();
        }
        debug!(collection = %collection, id, removed, "remove");
        Ok(removed)
    }

    /// Returns every readable record of a collection.
    pub async fn list_all(&self, collection: Collection) -> StorageResult<Vec<Record>> {
        let backend = self.backend()?;
        let records = self.track(backend.list_all(collection).await)?;
        self.stats.record_scan();
        Ok(records)
    }

    /// Removes every entry of a collection, including undecodable ones.
    pub async fn clear(&self, collection: Collection) -> StorageResult<usize> {
        let backend = self.backend()?;
        let removed = self.track(backend.clear(collection).await)?;
        for _ in 0..removed {
            self.stats.record_delete();
        }
        Ok(removed)
    }

    /// Returns the selected backend's usage estimate.
    pub async fn estimate(&self) -> StorageResult<Option<QuotaEstimate>> {
        let backend = self.backend()?;
        self.track(backend.estimate().await)
    }
}
