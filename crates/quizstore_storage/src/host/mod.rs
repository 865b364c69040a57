//! Host storage capabilities.
//!
//! The host environment provides two kinds of storage:
//! - a synchronous flat string key-value store ([`FlatHost`])
//! - an asynchronous structured engine of named stores ([`StructuredHost`])
//!
//! Backends are written against these traits only, so any host that
//! implements them can carry a QuizStore installation.

mod dir;
mod file;
mod memory;

pub use dir::DirStructuredHost;
pub use file::FileFlatHost;
pub use memory::{MemoryFlatHost, MemoryStructuredHost};

use crate::error::StorageResult;
use crate::types::QuotaEstimate;
use async_trait::async_trait;

/// A synchronous flat key-value store of strings.
///
/// Mirrors the shape of browser `localStorage`: no namespaces, string keys,
/// string values.
pub trait FlatHost: Send + Sync {
    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host read fails.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded` if the host is full, or another error if the
    /// write fails.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the host write fails.
    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Returns every key currently stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the host enumeration fails.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// An asynchronous structured storage engine.
///
/// Organised into named stores of keyed byte values, modelled on IndexedDB.
/// A database is opened with a version number; the host remembers the last
/// version it was opened with so callers can run schema upgrades once.
#[async_trait]
pub trait StructuredHost: Send + Sync {
    /// Returns true if the engine is usable in this environment.
    fn is_available(&self) -> bool;

    /// Opens the named database at `version`.
    ///
    /// Returns the version the database was previously opened with, or `0`
    /// if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    async fn open(&self, db_name: &str, version: u32) -> StorageResult<u32>;

    /// Returns the names of the existing stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is not open or the query fails.
    async fn store_names(&self) -> StorageResult<Vec<String>>;

    /// Creates a store. Creating an existing store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is not open or creation fails.
    async fn create_store(&self, name: &str) -> StorageResult<()>;

    /// Reads the value stored under `key` in `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store does not exist or the read fails.
    async fn get(&self, store: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Writes `value` under `key` in `store`.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded` if the host is full, or another error if the
    /// write fails.
    async fn put(&self, store: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Deletes `key` from `store`, returning whether it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the store does not exist or the delete fails.
    async fn delete(&self, store: &str, key: &str) -> StorageResult<bool>;

    /// Returns every (key, value) pair in `store`, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store does not exist or the read fails.
    async fn get_all(&self, store: &str) -> StorageResult<Vec<(String, Vec<u8>)>>;

    /// Returns the host's usage and quota estimate, if it offers one.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn estimate(&self) -> StorageResult<Option<QuotaEstimate>>;
}
