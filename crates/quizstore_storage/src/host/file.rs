//! File-based flat host for persistent installations.

use super::FlatHost;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A flat host persisted as a single JSON object file.
///
/// Every `set_item`/`remove_item` rewrites the whole file through a
/// temporary file and a rename, so a crash never leaves a half-written
/// file behind. Flat storage holds at most a few megabytes, so rewriting
/// it whole is acceptable.
///
/// # Locking
///
/// An exclusive advisory lock on `<path>.lock` is held for the lifetime of
/// the host. A second process opening the same file gets a backend error.
///
/// # Example
///
/// ```no_run
/// use quizstore_storage::{FileFlatHost, FlatHost};
/// use std::path::Path;
///
/// let host = FileFlatHost::open(Path::new("flat.json")).unwrap();
/// host.set_item("artQuizData", "{}").unwrap();
/// ```
#[derive(Debug)]
pub struct FileFlatHost {
    path: PathBuf,
    items: RwLock<BTreeMap<String, String>>,
    _lock: File,
}

impl FileFlatHost {
    /// Opens or creates a flat host at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a JSON object of
    /// strings, or is locked by another process.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_path = sidecar(path, "lock");
        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        lock.try_lock_exclusive().map_err(|_| {
            StorageError::backend(format!("flat storage is locked: {}", path.display()))
        })?;

        let items = match fs::read(path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            items: RwLock::new(items),
            _lock: lock,
        })
    }

    /// Returns the path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> StorageResult<()> {
        let tmp_path = sidecar(&self.path, "tmp");
        let encoded = serde_json::to_vec(items)?;

        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&encoded)?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn sidecar(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

impl FlatHost for FileFlatHost {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut items = self.items.write();
        let previous = items.insert(key.to_string(), value.to_string());

        if let Err(e) = self.persist(&items) {
            // keep memory in step with disk
            match previous {
                Some(old) => items.insert(key.to_string(), old),
                None => items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let mut items = self.items.write();
        let Some(previous) = items.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.persist(&items) {
            items.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.items.read().keys().cloned().collect())
    }
}

impl Drop for FileFlatHost {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self._lock);
    }
}
