//! Time-based automatic backups.

use super::{BackupManager, BackupOptions};
use crate::router::StoreRouter;
use chrono::{DateTime, Duration, TimeZone, Utc};
use quizstore_storage::StorageResult;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Creates at most one backup per interval.
///
/// The time of the last automatic backup is kept in flat storage under
/// `last_backup_key` as Unix milliseconds, outside any collection. After
/// each automatic backup, backups beyond `backup_keep_count` are rotated
/// out.
pub struct AutoBackupPolicy {
    router: Arc<StoreRouter>,
    manager: BackupManager,
}

impl AutoBackupPolicy {
    /// Creates a policy over `router`, configured from its `StoreConfig`.
    pub fn new(router: Arc<StoreRouter>) -> Self {
        let manager = BackupManager::new(Arc::clone(&router));
        Self { router, manager }
    }

    fn interval(&self) -> Duration {
        Duration::from_std(self.router.config().auto_backup_interval)
            .unwrap_or_else(|_| Duration::days(1))
    }

    /// Returns when the last automatic backup was taken.
    ///
    /// An unreadable timestamp reads as `None`.
    pub fn last_backup(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let key = &self.router.config().last_backup_key;
        let Some(raw) = self.router.flat_host().get_item(key)? else {
            return Ok(None);
        };
        let at = raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single());
        if at.is_none() {
            warn!(value = %raw, "ignoring unreadable backup timestamp");
        }
        Ok(at)
    }

    /// Returns true if an automatic backup is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> StorageResult<bool> {
        Ok(match self.last_backup()? {
            Some(last) => now - last > self.interval(),
            None => true,
        })
    }

    /// Creates `auto_YYYYMMDD` if a backup is due at `now`.
    ///
    /// Returns the id of the backup created, if any. When creation fails
    /// the timestamp is left untouched, so the next call tries again.
    pub async fn maybe_backup(&self, now: DateTime<Utc>) -> StorageResult<Option<String>> {
        if !self.is_due(now)? {
            debug!("automatic backup not due");
            return Ok(None);
        }

        let name = format!("auto_{}", now.format("%Y%m%d"));
        let id = self
            .manager
            .create(BackupOptions::new().name(name).created_at(now))
            .await?;

        let config = self.router.config();
        self.router
            .flat_host()
            .set_item(&config.last_backup_key, &now.timestamp_millis().to_string())?;
        info!(id = %id, "automatic backup created");

        self.manager.cleanup(config.backup_keep_count).await?;
        Ok(Some(id))
    }
}
