//! Structured backend (the primary).
//!
//! Each collection is one store of the host's structured engine. Records
//! are stored whole, keyed by `id`, as their JSON encoding.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::host::StructuredHost;
use crate::record::Record;
use crate::types::{BackendKind, Collection, QuotaEstimate};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A backend over the host's asynchronous structured engine.
pub struct StructuredBackend {
    host: Arc<dyn StructuredHost>,
    created: Vec<Collection>,
}

impl StructuredBackend {
    /// Opens the structured backend, creating missing collections.
    ///
    /// Collection creation runs when the database is new, when its stored
    /// version is older than `version`, or when a collection has gone
    /// missing. Collections that already exist are left untouched, so
    /// reopening is idempotent.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` if the host lacks a structured engine, or a
    /// backend error if the database cannot be opened or upgraded.
    pub async fn open(
        host: Arc<dyn StructuredHost>,
        db_name: &str,
        version: u32,
    ) -> StorageResult<Self> {
        if !host.is_available() {
            return Err(StorageError::unsupported("structured storage is not available"));
        }

        let previous = host.open(db_name, version).await?;
        if previous < version {
            info!(db_name, from = previous, to = version, "upgrading structured schema");
        }

        let existing = host.store_names().await?;
        let mut created = Vec::new();
        for collection in Collection::ALL {
            if existing.iter().any(|name| name == collection.as_str()) {
                continue;
            }
            host.create_store(collection.as_str()).await?;
            debug!(collection = %collection, "created object store");
            created.push(collection);
        }

        Ok(Self { host, created })
    }

    /// Returns the collections created while opening.
    #[must_use]
    pub fn created_collections(&self) -> &[Collection] {
        &self.created
    }

    fn decode(collection: Collection, id: &str, bytes: &[u8]) -> Option<Record> {
        match serde_json::from_slice::<Record>(bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(collection = %collection, id, error = %e, "skipping corrupted record");
                None
            }
        }
    }
}

#[async_trait]
impl StorageBackend for StructuredBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Structured
    }

    async fn get(&self, collection: Collection, id: &str) -> StorageResult<Option<Record>> {
        let bytes = self.host.get(collection.as_str(), id).await?;
        Ok(bytes.and_then(|bytes| Self::decode(collection, id, &bytes)))
    }

    async fn put(&self, collection: Collection, record: Record) -> StorageResult<()> {
        let encoded = serde_json::to_vec(&record)?;
        let size = encoded.len();
        self.host
            .put(collection.as_str(), &record.id, encoded)
            .await?;
        debug!(collection = %collection, id = %record.id, size, "structured write");
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> StorageResult<bool> {
        self.host.delete(collection.as_str(), id).await
    }

    async fn list_all(&self, collection: Collection) -> StorageResult<Vec<Record>> {
        let entries = self.host.get_all(collection.as_str()).await?;
        Ok(entries
            .iter()
            .filter_map(|(id, bytes)| Self::decode(collection, id, bytes))
            .collect())
    }

    async fn clear(&self, collection: Collection) -> StorageResult<usize> {
        let mut removed = 0;
        for (id, _) in self.host.get_all(collection.as_str()).await? {
            if self.host.delete(collection.as_str(), &id).await? {
                removed += 1;
            }
        }
        debug!(collection = %collection, removed, "structured clear");
        Ok(removed)
    }

    async fn estimate(&self) -> StorageResult<Option<QuotaEstimate>> {
        self.host.estimate().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryStructuredHost;
    use serde_json::json;

    async fn open_memory() -> (Arc<MemoryStructuredHost>, StructuredBackend) {
        let host = Arc::new(MemoryStructuredHost::new());
        let backend = StructuredBackend::open(Arc::clone(&host) as Arc<dyn StructuredHost>, "ArtQuizDB", 1)
            .await
            .unwrap();
        (host, backend)
    }

    #[tokio::test]
    async fn open_creates_all_collections_once() {
        let host = Arc::new(MemoryStructuredHost::new());
        let first = StructuredBackend::open(Arc::clone(&host) as Arc<dyn StructuredHost>, "db", 1)
            .await
            .unwrap();
        assert_eq!(first.created_collections(), &Collection::ALL);

        let second = StructuredBackend::open(Arc::clone(&host) as Arc<dyn StructuredHost>, "db", 1)
            .await
            .unwrap();
        assert!(second.created_collections().is_empty());
    }

    #[tokio::test]
    async fn open_keeps_existing_records_on_upgrade() {
        let (host, backend) = open_memory().await;
        backend
            .put(Collection::QuizData, Record::new("main", json!(1), "1"))
            .await
            .unwrap();

        let upgraded = StructuredBackend::open(Arc::clone(&host) as Arc<dyn StructuredHost>, "ArtQuizDB", 2)
            .await
            .unwrap();
        assert!(upgraded.created_collections().is_empty());
        assert!(upgraded.get(Collection::QuizData, "main").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unavailable_host_is_unsupported() {
        let host: Arc<dyn StructuredHost> = Arc::new(MemoryStructuredHost::unavailable());
        let result = StructuredBackend::open(host, "db", 1).await;
        assert!(matches!(result, Err(StorageError::Unsupported(_))));
    }

    #[tokio::test]
    async fn failing_open_is_a_backend_error() {
        let host = MemoryStructuredHost::new();
        host.set_fail_open(true);
        let result = StructuredBackend::open(Arc::new(host), "db", 1).await;
        assert!(matches!(result, Err(StorageError::Backend { .. })));
    }

    #[tokio::test]
    async fn put_replaces_whole_record() {
        let (_host, backend) = open_memory().await;
        backend
            .put(Collection::Settings, Record::new("s", json!({"a": 1, "b": 2}), "1"))
            .await
            .unwrap();
        backend
            .put(Collection::Settings, Record::new("s", json!({"c": 3}), "1"))
            .await
            .unwrap();

        let record = backend.get(Collection::Settings, "s").await.unwrap().unwrap();
        assert_eq!(record.payload, json!({"c": 3}));
    }

    #[tokio::test]
    async fn corrupted_records_are_skipped() {
        let (host, backend) = open_memory().await;
        host.put("backup", "bad", b"\xff\x00garbage".to_vec())
            .await
            .unwrap();
        backend
            .put(Collection::Backup, Record::new("good", json!(1), "1"))
            .await
            .unwrap();

        assert_eq!(backend.get(Collection::Backup, "bad").await.unwrap(), None);
        let all = backend.list_all(Collection::Backup).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "good");
    }

    #[tokio::test]
    async fn read_failures_are_reported() {
        let (host, backend) = open_memory().await;
        host.set_fail_reads(true);
        let result = backend.get(Collection::QuizData, "main").await;
        assert!(matches!(result, Err(StorageError::Backend { .. })));
    }

    #[tokio::test]
    async fn quota_failures_are_reported() {
        let (host, backend) = open_memory().await;
        host.set_quota(Some(32));
        let result = backend
            .put(Collection::QuizData, Record::new("main", json!("x".repeat(64)), "1"))
            .await;
        assert!(result.unwrap_err().is_quota_exceeded());
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let (_host, backend) = open_memory().await;
        backend
            .put(Collection::UserProgress, Record::new("main", json!([]), "1"))
            .await
            .unwrap();
        assert!(backend.delete(Collection::UserProgress, "main").await.unwrap());
        assert!(!backend.delete(Collection::UserProgress, "main").await.unwrap());
    }

    #[tokio::test]
    async fn clear_removes_undecodable_entries() {
        let (host, backend) = open_memory().await;
        host.put("settings", "bad", b"garbage".to_vec()).await.unwrap();
        backend
            .put(Collection::Settings, Record::new("good", json!(1), "1"))
            .await
            .unwrap();
        backend
            .put(Collection::QuizData, Record::new("main", json!(2), "1"))
            .await
            .unwrap();

        assert_eq!(backend.clear(Collection::Settings).await.unwrap(), 2);
        assert!(host.get_all("settings").await.unwrap().is_empty());
        assert_eq!(backend.list_all(Collection::QuizData).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn floats_round_trip_exactly() {
        let (_host, backend) = open_memory().await;
        let value = 1.071_566_039_146_582_6e-75_f64;
        backend
            .put(Collection::Settings, Record::new("f", json!(value), "1"))
            .await
            .unwrap();

        let record = backend.get(Collection::Settings, "f").await.unwrap().unwrap();
        assert_eq!(record.payload.as_f64().map(f64::to_bits), Some(value.to_bits()));
    }
}
