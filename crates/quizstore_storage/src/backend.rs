//! Storage backend trait definition.

use crate::error::StorageResult;
use crate::record::Record;
use crate::types::{BackendKind, Collection, QuotaEstimate};
use async_trait::async_trait;

/// The uniform record contract shared by every backend.
///
/// Backends store [`Record`]s keyed by (collection, id). They never inspect
/// payloads. Both the flat and the structured backend implement this trait
/// so the router can hold whichever one it selected behind a
/// `Box<dyn StorageBackend>`.
///
/// # Invariants
///
/// - `put` replaces any existing record with the same (collection, id)
/// - `get` after a successful `put` returns that record
/// - `delete` returns `true` only if a record was present
/// - records that fail to decode are skipped by `get` and `list_all`
/// - `clear` removes every stored entry of a collection, decodable or not
///
/// # Implementors
///
/// - [`super::StructuredBackend`] - the primary backend
/// - [`super::FlatBackend`] - the synchronous fallback
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Returns which kind of backend this is.
    fn kind(&self) -> BackendKind;

    /// Reads one record.
    ///
    /// Returns `Ok(None)` if the record is absent or cannot be decoded.
    ///
    /// # Errors
    ///
    /// Returns an error if the host read fails.
    async fn get(&self, collection: Collection, id: &str) -> StorageResult<Option<Record>>;

    /// Writes or replaces a record.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded` if the write was refused for size or
    /// capacity, or another error if the host write fails.
    async fn put(&self, collection: Collection, record: Record) -> StorageResult<()>;

    /// Deletes a record, returning whether one was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the host delete fails.
    async fn delete(&self, collection: Collection, id: &str) -> StorageResult<bool>;

    /// Returns every decodable record in a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the host enumeration fails.
    async fn list_all(&self, collection: Collection) -> StorageResult<Vec<Record>>;

    /// Removes every entry stored in a collection, returning how many were
    /// removed.
    ///
    /// Unlike `list_all`, this walks raw host keys, so entries that cannot
    /// be decoded are removed too.
    ///
    /// # Errors
    ///
    /// Returns an error if the host enumeration or a delete fails.
    async fn clear(&self, collection: Collection) -> StorageResult<usize>;

    /// Estimates how much of the host's capacity is in use.
    ///
    /// Returns `Ok(None)` when the host offers no estimate.
    ///
    /// # Errors
    ///
    /// Returns an error if the host query fails.
    async fn estimate(&self) -> StorageResult<Option<QuotaEstimate>>;
}
