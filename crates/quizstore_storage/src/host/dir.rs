//! Directory-backed structured host.
//!
//! ## Layout
//!
//! ```text
//! <root>/<db_name>/VERSION
//! <root>/<db_name>/<store>/<hex(key)>.rec
//! ```
//!
//! Keys are hex-encoded so any record id maps to a valid file name.

use super::StructuredHost;
use crate::error::{StorageError, StorageResult};
use crate::types::QuotaEstimate;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

const VERSION_FILE: &str = "VERSION";
const RECORD_EXT: &str = "rec";

/// A structured host that keeps one directory per store and one file per
/// record.
///
/// All I/O goes through `tokio::fs`, so operations suspend the caller the
/// way a browser's structured engine does.
#[derive(Debug)]
pub struct DirStructuredHost {
    root: PathBuf,
    capacity: Option<u64>,
    db_dir: RwLock<Option<PathBuf>>,
}

impl DirStructuredHost {
    /// Creates a host rooted at `root`. Nothing is touched until `open`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            capacity: None,
            db_dir: RwLock::new(None),
        }
    }

    /// Sets the capacity reported by `estimate`.
    #[must_use]
    pub fn with_capacity(mut self, bytes: u64) -> Self {
        self.capacity = Some(bytes);
        self
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn db_dir(&self) -> StorageResult<PathBuf> {
        self.db_dir
            .read()
            .clone()
            .ok_or_else(|| StorageError::backend("database is not open"))
    }

    async fn store_dir(&self, store: &str) -> StorageResult<PathBuf> {
        let dir = self.db_dir()?.join(store);
        if fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            Ok(dir)
        } else {
            Err(StorageError::backend(format!("object store not found: {store}")))
        }
    }
}

fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() * 2 + RECORD_EXT.len() + 1);
    for byte in key.as_bytes() {
        out.push_str(&format!("{byte:02x}"));
    }
    out.push('.');
    out.push_str(RECORD_EXT);
    out
}

fn decode_key(file_name: &str) -> Option<String> {
    let hex = file_name.strip_suffix(RECORD_EXT)?.strip_suffix('.')?;
    if !hex.is_ascii() || hex.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}

#[async_trait]
impl StructuredHost for DirStructuredHost {
    fn is_available(&self) -> bool {
        true
    }

    async fn open(&self, db_name: &str, version: u32) -> StorageResult<u32> {
        let db_dir = self.root.join(db_name);
        fs::create_dir_all(&db_dir).await?;

        let version_path = db_dir.join(VERSION_FILE);
        let previous = match fs::read_to_string(&version_path).await {
            Ok(text) => text.trim().parse::<u32>().map_err(|_| {
                StorageError::corrupted(format!("invalid version file: {}", version_path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        if version < previous {
            return Err(StorageError::backend(format!(
                "requested version {version} is older than stored version {previous}"
            )));
        }
        if version != previous {
            fs::write(&version_path, version.to_string()).await?;
        }

        *self.db_dir.write() = Some(db_dir);
        Ok(previous)
    }

    async fn store_names(&self) -> StorageResult<Vec<String>> {
        let db_dir = self.db_dir()?;
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&db_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn create_store(&self, name: &str) -> StorageResult<()> {
        let dir = self.db_dir()?.join(name);
        fs::create_dir_all(dir).await?;
        Ok(())
    }

    async fn get(&self, store: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.store_dir(store).await?.join(encode_key(key));
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, store: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        let dir = self.store_dir(store).await?;

        if let Some(capacity) = self.capacity {
            let replaced = fs::metadata(dir.join(encode_key(key)))
                .await
                .map(|m| m.len())
                .unwrap_or(0);
            let used = self.estimate().await?.map_or(0, |e| e.used_bytes);
            let needed = used - replaced.min(used) + value.len() as u64;
            if needed > capacity {
                return Err(StorageError::quota_exceeded(format!(
                    "structured host full: {needed} bytes needed, capacity {capacity}"
                )));
            }
        }

        let path = dir.join(encode_key(key));
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &value).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, store: &str, key: &str) -> StorageResult<bool> {
        let path = self.store_dir(store).await?.join(encode_key(key));
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_all(&self, store: &str) -> StorageResult<Vec<(String, Vec<u8>)>> {
        let dir = self.store_dir(store).await?;
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(key) = decode_key(&name) else {
                continue;
            };
            records.push((key, fs::read(entry.path()).await?));
        }
        records.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(records)
    }

    async fn estimate(&self) -> StorageResult<Option<QuotaEstimate>> {
        let Some(total_bytes) = self.capacity else {
            return Ok(None);
        };

        let db_dir = self.db_dir()?;
        let mut used_bytes = 0u64;
        let mut stores = fs::read_dir(&db_dir).await?;
        while let Some(store) = stores.next_entry().await? {
            if !store.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(store.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                used_bytes += entry.metadata().await?.len();
            }
        }

        Ok(Some(QuotaEstimate {
            used_bytes,
            total_bytes,
        }))
    }
}
