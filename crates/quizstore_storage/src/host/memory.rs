//! In-memory hosts for testing and ephemeral installations.

use super::{FlatHost, StructuredHost};
use crate::error::{StorageError, StorageResult};
use crate::types::QuotaEstimate;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// An in-memory flat host.
///
/// Suitable for:
/// - Unit and integration tests
/// - Installations that do not need persistence
///
/// An optional capacity makes `set_item` fail with `QuotaExceeded` once the
/// summed key and value lengths would exceed it, the way a browser's
/// `localStorage` throws when full.
///
/// # Example
///
/// ```rust
/// use quizstore_storage::{FlatHost, MemoryFlatHost};
///
/// let host = MemoryFlatHost::new();
/// host.set_item("artQuizData", "{\"a\":1}").unwrap();
/// assert_eq!(host.get_item("artQuizData").unwrap().as_deref(), Some("{\"a\":1}"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryFlatHost {
    items: RwLock<BTreeMap<String, String>>,
    capacity: Option<usize>,
}

impl MemoryFlatHost {
    /// Creates an empty host with no capacity limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty host that refuses writes beyond `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            capacity: Some(capacity),
        }
    }

    /// Creates a host pre-populated with items.
    ///
    /// Useful for simulating data left behind by an older installation.
    #[must_use]
    pub fn with_items<K, V>(items: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            items: RwLock::new(
                items
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            capacity: None,
        }
    }

    /// Returns a copy of every stored item.
    #[must_use]
    pub fn items(&self) -> BTreeMap<String, String> {
        self.items.read().clone()
    }

    /// Returns the number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Removes every item.
    pub fn clear(&self) {
        self.items.write().clear();
    }
}

impl FlatHost for MemoryFlatHost {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut items = self.items.write();

        if let Some(capacity) = self.capacity {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > capacity {
                return Err(StorageError::quota_exceeded(format!(
                    "flat host full: {needed} bytes needed, capacity {capacity}"
                )));
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.items.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.items.read().keys().cloned().collect())
    }
}

/// Faults that can be injected into a [`MemoryStructuredHost`].
#[derive(Debug, Clone, Default)]
struct Faults {
    unavailable: bool,
    fail_open: bool,
    fail_reads: bool,
    fail_writes: bool,
    quota_bytes: Option<u64>,
    estimate_total: Option<u64>,
}

#[derive(Debug, Default)]
struct Database {
    name: Option<String>,
    version: u32,
    open: bool,
    stores: HashMap<String, BTreeMap<String, Vec<u8>>>,
}

impl Database {
    fn used_bytes(&self) -> u64 {
        self.stores
            .values()
            .flat_map(|store| store.iter())
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }

    fn require_open(&self) -> StorageResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(StorageError::backend("database is not open"))
        }
    }

    fn store(&self, name: &str) -> StorageResult<&BTreeMap<String, Vec<u8>>> {
        self.require_open()?;
        self.stores
            .get(name)
            .ok_or_else(|| StorageError::backend(format!("object store not found: {name}")))
    }

    fn store_mut(&mut self, name: &str) -> StorageResult<&mut BTreeMap<String, Vec<u8>>> {
        self.require_open()?;
        self.stores
            .get_mut(name)
            .ok_or_else(|| StorageError::backend(format!("object store not found: {name}")))
    }
}

/// An in-memory structured host with fault injection.
///
/// Behaves like a single IndexedDB database. Tests use the fault switches
/// to simulate a host without the capability, a database that refuses to
/// open, failing reads after a successful open, or a full quota.
///
/// # Example
///
/// ```rust
/// use quizstore_storage::MemoryStructuredHost;
///
/// let host = MemoryStructuredHost::new();
/// host.set_fail_open(true);
/// // Opening a StructuredBackend over this host now fails, and the
/// // router falls back to flat storage.
/// ```
#[derive(Debug, Default)]
pub struct MemoryStructuredHost {
    db: RwLock<Database>,
    faults: RwLock<Faults>,
}

impl MemoryStructuredHost {
    /// Creates an available, empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a host that reports the capability as missing.
    #[must_use]
    pub fn unavailable() -> Self {
        let host = Self::new();
        host.faults.write().unavailable = true;
        host
    }

    /// Makes `open` fail.
    pub fn set_fail_open(&self, fail: bool) {
        self.faults.write().fail_open = fail;
    }

    /// Makes every read (`get`, `get_all`) fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.faults.write().fail_reads = fail;
    }

    /// Makes every write (`put`, `delete`) fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.faults.write().fail_writes = fail;
    }

    /// Limits total stored bytes; writes beyond it fail with `QuotaExceeded`.
    pub fn set_quota(&self, bytes: Option<u64>) {
        self.faults.write().quota_bytes = bytes;
    }

    /// Makes `estimate` report usage against `total` bytes.
    pub fn set_estimate_total(&self, total: Option<u64>) {
        self.faults.write().estimate_total = total;
    }

    /// Returns the version the database was last opened with.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.db.read().version
    }

    /// Returns the number of records in `store`, or 0 if it does not exist.
    #[must_use]
    pub fn record_count(&self, store: &str) -> usize {
        self.db.read().stores.get(store).map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl StructuredHost for MemoryStructuredHost {
    fn is_available(&self) -> bool {
        !self.faults.read().unavailable
    }

    async fn open(&self, db_name: &str, version: u32) -> StorageResult<u32> {
        if self.faults.read().fail_open {
            return Err(StorageError::backend(format!(
                "failed to open database {db_name}"
            )));
        }

        let mut db = self.db.write();
        if let Some(existing) = &db.name {
            if existing != db_name {
                return Err(StorageError::backend(format!(
                    "host already holds database {existing}"
                )));
            }
        }
        if version < db.version {
            return Err(StorageError::backend(format!(
                "requested version {version} is older than stored version {}",
                db.version
            )));
        }

        let previous = db.version;
        db.name = Some(db_name.to_string());
        db.version = version;
        db.open = true;
        Ok(previous)
    }

    async fn store_names(&self) -> StorageResult<Vec<String>> {
        let db = self.db.read();
        db.require_open()?;
        let mut names: Vec<String> = db.stores.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_store(&self, name: &str) -> StorageResult<()> {
        let mut db = self.db.write();
        db.require_open()?;
        db.stores.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn get(&self, store: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        if self.faults.read().fail_reads {
            return Err(StorageError::backend(format!("read failed: {store}/{key}")));
        }
        let db = self.db.read();
        Ok(db.store(store)?.get(key).cloned())
    }

    async fn put(&self, store: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        let faults = self.faults.read().clone();
        if faults.fail_writes {
            return Err(StorageError::backend(format!("write failed: {store}/{key}")));
        }

        let mut db = self.db.write();
        if let Some(quota) = faults.quota_bytes {
            let replaced = db
                .store(store)?
                .get(key)
                .map_or(0, |old| (key.len() + old.len()) as u64);
            let needed = db.used_bytes() - replaced + (key.len() + value.len()) as u64;
            if needed > quota {
                return Err(StorageError::quota_exceeded(format!(
                    "structured host full: {needed} bytes needed, quota {quota}"
                )));
            }
        }

        db.store_mut(store)?.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, store: &str, key: &str) -> StorageResult<bool> {
        if self.faults.read().fail_writes {
            return Err(StorageError::backend(format!("delete failed: {store}/{key}")));
        }
        let mut db = self.db.write();
        Ok(db.store_mut(store)?.remove(key).is_some())
    }

    async fn get_all(&self, store: &str) -> StorageResult<Vec<(String, Vec<u8>)>> {
        if self.faults.read().fail_reads {
            return Err(StorageError::backend(format!("read failed: {store}")));
        }
        let db = self.db.read();
        Ok(db
            .store(store)?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn estimate(&self) -> StorageResult<Option<QuotaEstimate>> {
        let faults = self.faults.read().clone();
        let total = faults.estimate_total.or(faults.quota_bytes);
        Ok(total.map(|total_bytes| QuotaEstimate {
            used_bytes: self.db.read().used_bytes(),
            total_bytes,
        }))
    }
}
