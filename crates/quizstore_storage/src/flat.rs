//! Flat key-value backend (the fallback).
//!
//! Collections do not exist in flat storage, so (collection, id) is folded
//! into one composite key `"{collection}_{id}"`. Two singleton records keep
//! the keys the application used before the structured backend existed:
//!
//! | Record | Flat key |
//! |--------|----------|
//! | `quizData/main` | `artQuizData` |
//! | `userProgress/main` | `artQuizData_userProgress` |
//!
//! Legacy keys hold the bare payload JSON, exactly as older installations
//! wrote it. Every other key holds the full [`Record`] envelope.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::host::FlatHost;
use crate::record::Record;
use crate::types::{BackendKind, Collection, QuotaEstimate, CANONICAL_ID};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Legacy flat key of the question bank.
pub const LEGACY_QUIZ_DATA_KEY: &str = "artQuizData";

/// Legacy flat key of the user progress record.
pub const LEGACY_USER_PROGRESS_KEY: &str = "artQuizData_userProgress";

/// Largest serialized value the flat backend will attempt to write.
pub const DEFAULT_WRITE_LIMIT: usize = 2 * 1024 * 1024;

/// Assumed capacity of flat host storage.
pub const DEFAULT_CAPACITY: u64 = 5 * 1024 * 1024;

/// Configuration for the flat backend.
#[derive(Debug, Clone)]
pub struct FlatConfig {
    /// Flat key holding `quizData/main`.
    pub quiz_data_key: String,
    /// Flat key holding `userProgress/main`.
    pub user_progress_key: String,
    /// Writes whose serialized value exceeds this many bytes are refused
    /// before they reach the host. This is a policy threshold, not a
    /// measured platform limit.
    pub write_limit: usize,
    /// Capacity assumed when estimating usage.
    pub capacity: u64,
}

impl Default for FlatConfig {
    fn default() -> Self {
        Self {
            quiz_data_key: LEGACY_QUIZ_DATA_KEY.to_string(),
            user_progress_key: LEGACY_USER_PROGRESS_KEY.to_string(),
            write_limit: DEFAULT_WRITE_LIMIT,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl FlatConfig {
    /// Sets the write size threshold.
    #[must_use]
    pub fn write_limit(mut self, bytes: usize) -> Self {
        self.write_limit = bytes;
        self
    }

    /// Sets the assumed capacity.
    #[must_use]
    pub fn capacity(mut self, bytes: u64) -> Self {
        self.capacity = bytes;
        self
    }

    /// Returns the legacy flat key for a record, if it has one.
    #[must_use]
    pub fn legacy_key(&self, collection: Collection, id: &str) -> Option<&str> {
        if id != CANONICAL_ID {
            return None;
        }
        match collection {
            Collection::QuizData => Some(self.quiz_data_key.as_str()),
            Collection::UserProgress => Some(self.user_progress_key.as_str()),
            Collection::Settings | Collection::Backup => None,
        }
    }

    /// Returns the flat key a record is stored under.
    #[must_use]
    pub fn flat_key(&self, collection: Collection, id: &str) -> String {
        match self.legacy_key(collection, id) {
            Some(key) => key.to_string(),
            None => format!("{}_{}", collection.as_str(), id),
        }
    }

    /// Returns the (collection, id) a flat key belongs to, if any.
    #[must_use]
    pub fn parse_key(&self, key: &str) -> Option<(Collection, String)> {
        if key == self.quiz_data_key {
            return Some((Collection::QuizData, CANONICAL_ID.to_string()));
        }
        if key == self.user_progress_key {
            return Some((Collection::UserProgress, CANONICAL_ID.to_string()));
        }

        Collection::ALL.into_iter().find_map(|collection| {
            let id = key
                .strip_prefix(collection.as_str())?
                .strip_prefix('_')?;
            // shadowed by a legacy key
            if id.is_empty() || self.legacy_key(collection, id).is_some() {
                return None;
            }
            Some((collection, id.to_string()))
        })
    }
}

/// A backend over the host's synchronous flat storage.
///
/// Operations run synchronously but are exposed through the same async
/// [`StorageBackend`] contract as the structured backend.
pub struct FlatBackend {
    host: Arc<dyn FlatHost>,
    config: FlatConfig,
}

impl FlatBackend {
    /// Creates a flat backend over `host`.
    pub fn new(host: Arc<dyn FlatHost>, config: FlatConfig) -> Self {
        Self { host, config }
    }

    /// Returns the backend configuration.
    #[must_use]
    pub fn config(&self) -> &FlatConfig {
        &self.config
    }

    /// Returns the underlying host.
    #[must_use]
    pub fn host(&self) -> &Arc<dyn FlatHost> {
        &self.host
    }

    fn decode(&self, collection: Collection, id: &str, key: &str, raw: &str) -> Option<Record> {
        if self.config.legacy_key(collection, id).is_some() {
            return match serde_json::from_str(raw) {
                Ok(payload) => Some(Record::legacy(id, payload)),
                Err(e) => {
                    warn!(key, error = %e, "skipping unparseable legacy flat value");
                    None
                }
            };
        }

        match serde_json::from_str::<Record>(raw) {
            Ok(mut record) => {
                record.id = id.to_string();
                Some(record)
            }
            Err(e) => {
                warn!(key, error = %e, "skipping corrupted flat record");
                None
            }
        }
    }

    fn encode(&self, collection: Collection, record: &Record) -> StorageResult<String> {
        let encoded = if self.config.legacy_key(collection, &record.id).is_some() {
            serde_json::to_string(&record.payload)?
        } else {
            serde_json::to_string(record)?
        };
        Ok(encoded)
    }
}

#[async_trait]
impl StorageBackend for FlatBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Flat
    }

    async fn get(&self, collection: Collection, id: &str) -> StorageResult<Option<Record>> {
        let key = self.config.flat_key(collection, id);
        let Some(raw) = self.host.get_item(&key)? else {
            return Ok(None);
        };
        Ok(self.decode(collection, id, &key, &raw))
    }

    async fn put(&self, collection: Collection, record: Record) -> StorageResult<()> {
        let key = self.config.flat_key(collection, &record.id);
        let encoded = self.encode(collection, &record)?;

        if encoded.len() > self.config.write_limit {
            warn!(
                key = %key,
                size = encoded.len(),
                limit = self.config.write_limit,
                "refusing oversized flat write"
            );
            return Err(StorageError::quota_exceeded(format!(
                "{} bytes exceeds the flat write limit of {} bytes",
                encoded.len(),
                self.config.write_limit
            )));
        }

        self.host.set_item(&key, &encoded)?;
        debug!(key = %key, size = encoded.len(), "flat write");
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> StorageResult<bool> {
        let key = self.config.flat_key(collection, id);
        if self.host.get_item(&key)?.is_none() {
            return Ok(false);
        }
        self.host.remove_item(&key)?;
        Ok(true)
    }

    async fn list_all(&self, collection: Collection) -> StorageResult<Vec<Record>> {
        let mut records = Vec::new();
        for key in self.host.keys()? {
            let Some((owner, id)) = self.config.parse_key(&key) else {
                continue;
            };
            if owner != collection {
                continue;
            }
            let Some(raw) = self.host.get_item(&key)? else {
                continue;
            };
            if let Some(record) = self.decode(collection, &id, &key, &raw) {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn clear(&self, collection: Collection) -> StorageResult<usize> {
        let mut removed = 0;
        for key in self.host.keys()? {
            if matches!(self.config.parse_key(&key), Some((owner, _)) if owner == collection) {
                self.host.remove_item(&key)?;
                removed += 1;
            }
        }
        debug!(collection = %collection, removed, "flat clear");
        Ok(removed)
    }

    async fn estimate(&self) -> StorageResult<Option<QuotaEstimate>> {
        let mut used_bytes = 0u64;
        for key in self.host.keys()? {
            let value_units = self
                .host
                .get_item(&key)?
                .map_or(0, |v| v.encode_utf16().count());
            // host strings are UTF-16, two bytes per unit
            used_bytes += ((key.encode_utf16().count() + value_units) * 2) as u64;
        }
        Ok(Some(QuotaEstimate {
            used_bytes,
            total_bytes: self.config.capacity,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryFlatHost;
    use proptest::prelude::*;
    use serde_json::json;

    fn backend_with(host: Arc<MemoryFlatHost>) -> FlatBackend {
        FlatBackend::new(host, FlatConfig::default())
    }

    #[test]
    fn legacy_keys_map_singletons() {
        let config = FlatConfig::default();
        assert_eq!(config.flat_key(Collection::QuizData, "main"), "artQuizData");
        assert_eq!(
            config.flat_key(Collection::UserProgress, "main"),
            "artQuizData_userProgress"
        );
        assert_eq!(config.flat_key(Collection::QuizData, "other"), "quizData_other");
        assert_eq!(config.flat_key(Collection::Settings, "main"), "settings_main");
        assert_eq!(config.flat_key(Collection::Backup, "snap1"), "backup_snap1");
    }

    #[test]
    fn parse_key_inverts_flat_key() {
        let config = FlatConfig::default();
        assert_eq!(
            config.parse_key("artQuizData"),
            Some((Collection::QuizData, "main".to_string()))
        );
        assert_eq!(
            config.parse_key("backup_backup_17"),
            Some((Collection::Backup, "backup_17".to_string()))
        );
        assert_eq!(config.parse_key("quizData_main"), None);
        assert_eq!(config.parse_key("artQuizData_migrated_to_idb"), None);
        assert_eq!(config.parse_key("sidebarWidth"), None);
        assert_eq!(config.parse_key("backup_"), None);
    }

    #[tokio::test]
    async fn legacy_values_are_bare_payloads() {
        let host = Arc::new(MemoryFlatHost::new());
        let backend = backend_with(Arc::clone(&host));

        backend
            .put(Collection::QuizData, Record::new("main", json!({"a": 1}), "1"))
            .await
            .unwrap();

        assert_eq!(host.get_item("artQuizData").unwrap().as_deref(), Some(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn reads_pre_existing_legacy_data() {
        let host = Arc::new(MemoryFlatHost::with_items([(
            "artQuizData_userProgress",
            r#"{"answered":3}"#,
        )]));
        let backend = backend_with(host);

        let record = backend
            .get(Collection::UserProgress, "main")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.payload, json!({"answered": 3}));
        assert!(record.is_legacy());
    }

    #[tokio::test]
    async fn other_keys_hold_envelopes() {
        let host = Arc::new(MemoryFlatHost::new());
        let backend = backend_with(Arc::clone(&host));

        backend
            .put(Collection::Settings, Record::new("appSettings", json!({"theme": "dark"}), "2"))
            .await
            .unwrap();

        let raw = host.get_item("settings_appSettings").unwrap().unwrap();
        let envelope: Record = serde_json::from_str(&raw).unwrap();
        assert_eq!(envelope.schema_version, "2");

        let record = backend
            .get(Collection::Settings, "appSettings")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.payload, json!({"theme": "dark"}));
    }

    #[tokio::test]
    async fn corrupted_values_read_as_absent() {
        let host = Arc::new(MemoryFlatHost::with_items([
            ("artQuizData", "{broken"),
            ("backup_a", "not an envelope"),
        ]));
        let backend = backend_with(host);

        assert_eq!(backend.get(Collection::QuizData, "main").await.unwrap(), None);
        assert!(backend.list_all(Collection::Backup).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_write_is_refused_before_host() {
        let host = Arc::new(MemoryFlatHost::new());
        let backend = FlatBackend::new(
            Arc::clone(&host) as Arc<dyn FlatHost>,
            FlatConfig::default().write_limit(16),
        );

        let result = backend
            .put(
                Collection::QuizData,
                Record::new("main", json!("a string well over sixteen bytes"), "1"),
            )
            .await;

        assert!(matches!(result, Err(StorageError::QuotaExceeded { .. })));
        assert!(host.is_empty());
    }

    #[tokio::test]
    async fn host_quota_errors_surface() {
        let host = Arc::new(MemoryFlatHost::with_capacity(20));
        let backend = backend_with(host);

        let result = backend
            .put(Collection::QuizData, Record::new("main", json!("0123456789abcdef"), "1"))
            .await;
        assert!(result.unwrap_err().is_quota_exceeded());
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let backend = backend_with(Arc::new(MemoryFlatHost::new()));
        backend
            .put(Collection::Backup, Record::new("b1", json!(1), "1"))
            .await
            .unwrap();

        assert!(backend.delete(Collection::Backup, "b1").await.unwrap());
        assert!(!backend.delete(Collection::Backup, "b1").await.unwrap());
        assert_eq!(backend.get(Collection::Backup, "b1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_all_filters_by_collection() {
        let host = Arc::new(MemoryFlatHost::with_items([
            ("artQuizData", r#"{"q":1}"#),
            ("sidebarWidth", "320"),
            ("artQuizData_migrated_to_idb", "true"),
        ]));
        let backend = backend_with(host);
        backend
            .put(Collection::QuizData, Record::new("extra", json!(2), "1"))
            .await
            .unwrap();
        backend
            .put(Collection::Backup, Record::new("b1", json!(3), "1"))
            .await
            .unwrap();

        let quiz = backend.list_all(Collection::QuizData).await.unwrap();
        let ids: Vec<&str> = quiz.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["extra", "main"]);

        let backups = backend.list_all(Collection::Backup).await.unwrap();
        assert_eq!(backups.len(), 1);
        assert!(backend.list_all(Collection::Settings).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn estimate_counts_every_key() {
        let host = Arc::new(MemoryFlatHost::with_items([("ab", "cd"), ("e", "f")]));
        let backend = backend_with(host);

        let estimate = backend.estimate().await.unwrap().unwrap();
        assert_eq!(estimate.used_bytes, 12);
        assert_eq!(estimate.total_bytes, DEFAULT_CAPACITY);
    }

    #[tokio::test]
    async fn estimate_counts_utf16_units() {
        // "é" is two UTF-8 bytes but one UTF-16 unit, "😀" is four and two
        let host = Arc::new(MemoryFlatHost::with_items([("k", "é😀")]));
        let backend = backend_with(host);

        let estimate = backend.estimate().await.unwrap().unwrap();
        assert_eq!(estimate.used_bytes, (1 + 3) * 2);
    }

    #[tokio::test]
    async fn clear_removes_undecodable_entries() {
        let host = Arc::new(MemoryFlatHost::with_items([
            ("artQuizData", "{broken"),
            ("quizData_extra", "not an envelope"),
            ("settings_appSettings", "{}"),
            ("artQuizData_migrated_to_idb", "true"),
        ]));
        let backend = backend_with(Arc::clone(&host));

        assert_eq!(backend.clear(Collection::QuizData).await.unwrap(), 2);
        assert_eq!(host.get_item("artQuizData").unwrap(), None);
        assert_eq!(host.get_item("quizData_extra").unwrap(), None);
        assert!(host.get_item("settings_appSettings").unwrap().is_some());
        assert!(host.get_item("artQuizData_migrated_to_idb").unwrap().is_some());
    }

    proptest! {
        #[test]
        fn composite_keys_round_trip(id in "[a-zA-Z0-9_]{1,24}") {
            let config = FlatConfig::default();
            for collection in Collection::ALL {
                let key = config.flat_key(collection, &id);
                prop_assert_eq!(config.parse_key(&key), Some((collection, id.clone())));
            }
        }
    }
}
