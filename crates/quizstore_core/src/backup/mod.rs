//! Named, timestamped snapshots of live data.
//!
//! A backup is a record in the `backup` collection whose payload holds the
//! canonical (`main`) record of one or more collections. Backups go through
//! the [`StoreRouter`], so they work on whichever backend is selected.
//!
//! ## Backup record
//!
//! ```text
//! { id, name, createdAt, version, snapshot: { quizData, userProgress }, sizeBytes, checksum }
//! ```
//!
//! `checksum` is the hex SHA-256 of the serialized snapshot and is checked
//! before a restore writes anything. A `null` snapshot entry means the
//! record did not exist when the backup was taken; restoring removes it.

mod schedule;

pub use schedule::AutoBackupPolicy;

use crate::health::format_bytes;
use crate::router::StoreRouter;
use chrono::{DateTime, Utc};
use quizstore_storage::{Collection, StorageError, StorageResult, CANONICAL_ID};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collections captured when no snapshot is supplied.
pub const DEFAULT_SNAPSHOT_COLLECTIONS: [Collection; 2] =
    [Collection::QuizData, Collection::UserProgress];

/// Canonical payloads keyed by collection name.
pub type Snapshot = BTreeMap<String, Value>;

/// A stored backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    /// Backup id, also its key in the `backup` collection.
    pub id: String,
    /// Display name.
    pub name: String,
    /// When the backup was taken.
    pub created_at: DateTime<Utc>,
    /// Application version at backup time.
    pub version: String,
    /// Captured payloads.
    pub snapshot: Snapshot,
    /// Serialized length of `snapshot`.
    pub size_bytes: u64,
    /// Hex SHA-256 of the serialized snapshot.
    pub checksum: String,
}

impl Backup {
    /// Returns the listing view of this backup.
    #[must_use]
    pub fn summary(&self) -> BackupSummary {
        BackupSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            size_bytes: self.size_bytes,
            collections: self.snapshot.keys().cloned().collect(),
        }
    }

    fn verify(&self) -> StorageResult<()> {
        let (_, checksum) = digest(&self.snapshot)?;
        if checksum != self.checksum {
            return Err(StorageError::corrupted(format!(
                "backup {} checksum mismatch",
                self.id
            )));
        }
        Ok(())
    }
}

/// A backup without its snapshot, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSummary {
    /// Backup id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// When the backup was taken.
    pub created_at: DateTime<Utc>,
    /// Serialized snapshot length.
    pub size_bytes: u64,
    /// Collections captured.
    pub collections: Vec<String>,
}

impl BackupSummary {
    /// Returns the size as a human-readable string.
    #[must_use]
    pub fn display_size(&self) -> String {
        format_bytes(self.size_bytes)
    }
}

/// Options for [`BackupManager::create`].
#[derive(Debug, Clone, Default)]
pub struct BackupOptions {
    name: Option<String>,
    snapshot: Option<Snapshot>,
    created_at: Option<DateTime<Utc>>,
}

impl BackupOptions {
    /// Options for a default backup of live data, named by timestamp.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backup name. It is also used as the id.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Stores `snapshot` instead of reading live data.
    #[must_use]
    pub fn snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Overrides the creation time.
    #[must_use]
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

fn digest(snapshot: &Snapshot) -> StorageResult<(u64, String)> {
    let encoded = serde_json::to_vec(snapshot)?;
    let hash = Sha256::digest(&encoded);
    let hex: String = hash.iter().map(|b| format!("{b:02x}")).collect();
    Ok((encoded.len() as u64, hex))
}

/// Creates, lists, restores and rotates backups.
pub struct BackupManager {
    router: Arc<StoreRouter>,
}

impl BackupManager {
    /// Creates a manager over `router`.
    pub fn new(router: Arc<StoreRouter>) -> Self {
        Self { router }
    }

    /// Backs up live data, returning the backup id.
    ///
    /// The id is `name`, or `backup_{unix millis}` when no name is given.
    /// An existing backup with the same id is replaced.
    pub async fn create_backup(&self, name: Option<&str>) -> StorageResult<String> {
        let mut options = BackupOptions::new();
        if let Some(name) = name {
            options = options.name(name);
        }
        self.create(options).await
    }

    /// Creates a backup from `options`, returning its id.
    pub async fn create(&self, options: BackupOptions) -> StorageResult<String> {
        let created_at = options.created_at.unwrap_or_else(Utc::now);
        let id = match options.name {
            Some(name) if !name.is_empty() => name,
            _ => format!("backup_{}", created_at.timestamp_millis()),
        };

        let snapshot = match options.snapshot {
            Some(snapshot) => snapshot,
            None => self.capture().await?,
        };
        let (size_bytes, checksum) = digest(&snapshot)?;

        let backup = Backup {
            id: id.clone(),
            name: id.clone(),
            created_at,
            version: self.router.config().schema_version.clone(),
            snapshot,
            size_bytes,
            checksum,
        };
        self.router
            .set(Collection::Backup, &id, serde_json::to_value(&backup)?)
            .await?;

        info!(id = %id, size = size_bytes, "backup created");
        Ok(id)
    }

    async fn capture(&self) -> StorageResult<Snapshot> {
        let mut snapshot = Snapshot::new();
        for collection in DEFAULT_SNAPSHOT_COLLECTIONS {
            let payload = self.router.get(collection, CANONICAL_ID).await?;
            snapshot.insert(
                collection.as_str().to_string(),
                payload.unwrap_or(Value::Null),
            );
        }
        Ok(snapshot)
    }

    /// Reads one backup.
    pub async fn get_backup(&self, id: &str) -> StorageResult<Option<Backup>> {
        let Some(payload) = self.router.get(Collection::Backup, id).await? else {
            return Ok(None);
        };
        match serde_json::from_value(payload) {
            Ok(backup) => Ok(Some(backup)),
            Err(e) => {
                warn!(id, error = %e, "unreadable backup record");
                Ok(None)
            }
        }
    }

    async fn backups(&self) -> StorageResult<Vec<Backup>> {
        let records = self.router.list_all(Collection::Backup).await?;
        let mut backups: Vec<Backup> = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<Backup>(record.payload) {
                Ok(backup) => Some(backup),
                Err(e) => {
                    warn!(id = %record.id, error = %e, "skipping unreadable backup record");
                    None
                }
            })
            .collect();

        // newest first; ids break ties so the order is stable
        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(backups)
    }

    /// Lists backups newest first.
    pub async fn try_list_backups(&self) -> StorageResult<Vec<BackupSummary>> {
        Ok(self.backups().await?.iter().map(Backup::summary).collect())
    }

    /// Lists backups newest first, or nothing if they cannot be read.
    pub async fn list_backups(&self) -> Vec<BackupSummary> {
        match self.try_list_backups().await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "failed to list backups");
                Vec::new()
            }
        }
    }

    /// Writes a backup's snapshot back into the live collections.
    ///
    /// # Errors
    ///
    /// `NotFound` if no backup has this id, `Corrupted` if its checksum
    /// does not match. Nothing is written in either case.
    pub async fn restore_backup(&self, id: &str) -> StorageResult<()> {
        let backup = self
            .get_backup(id)
            .await?
            .ok_or_else(|| StorageError::not_found(Collection::Backup.as_str(), id))?;
        backup.verify()?;

        for (name, payload) in &backup.snapshot {
            let collection = match Collection::from_str(name) {
                Ok(Collection::Backup) | Err(_) => {
                    warn!(collection = %name, "ignoring snapshot entry");
                    continue;
                }
                Ok(collection) => collection,
            };

            if payload.is_null() {
                self.router.remove(collection, CANONICAL_ID).await?;
            } else {
                self.router
                    .set(collection, CANONICAL_ID, payload.clone())
                    .await?;
            }
            debug!(collection = %collection, "restored");
        }

        info!(id, "backup restored");
        Ok(())
    }

    /// Deletes one backup. Returns whether it existed.
    pub async fn delete_backup(&self, id: &str) -> StorageResult<bool> {
        self.router.remove(Collection::Backup, id).await
    }

    /// Deletes all but the `keep_count` newest backups.
    ///
    /// Returns the number removed.
    pub async fn cleanup(&self, keep_count: usize) -> StorageResult<usize> {
        let backups = self.backups().await?;
        let mut removed = 0;
        for backup in backups.iter().skip(keep_count) {
            if self.router.remove(Collection::Backup, &backup.id).await? {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, keep_count, "old backups removed");
        }
        Ok(removed)
    }
}
