//! Store configuration.

use quizstore_storage::FlatConfig;
use std::time::Duration;

/// Default structured database name.
pub const DEFAULT_DB_NAME: &str = "ArtQuizDB";

/// Flat key of the persisted migration flag.
pub const DEFAULT_MIGRATION_FLAG_KEY: &str = "artQuizData_migrated_to_idb";

/// Flat key of the last automatic backup timestamp.
pub const DEFAULT_LAST_BACKUP_KEY: &str = "lastAutoBackupTimestamp";

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Name of the structured database.
    pub db_name: String,

    /// Structured schema version. Raising it re-runs collection creation.
    pub db_version: u32,

    /// Application version stamped on every record.
    pub schema_version: String,

    /// Flat backend layout and limits.
    pub flat: FlatConfig,

    /// Flat key of the migration flag.
    pub migration_flag_key: String,

    /// Flat key of the last automatic backup timestamp.
    pub last_backup_key: String,

    /// Backups kept by automatic rotation.
    pub backup_keep_count: usize,

    /// Minimum time between automatic backups.
    pub auto_backup_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_name: DEFAULT_DB_NAME.to_string(),
            db_version: 1,
            schema_version: env!("CARGO_PKG_VERSION").to_string(),
            flat: FlatConfig::default(),
            migration_flag_key: DEFAULT_MIGRATION_FLAG_KEY.to_string(),
            last_backup_key: DEFAULT_LAST_BACKUP_KEY.to_string(),
            backup_keep_count: 10,
            auto_backup_interval: Duration::from_secs(24 * 60 * 60), // 24h
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the structured database name.
    #[must_use]
    pub fn db_name(mut self, name: impl Into<String>) -> Self {
        self.db_name = name.into();
        self
    }

    /// Sets the structured schema version.
    #[must_use]
    pub const fn db_version(mut self, version: u32) -> Self {
        self.db_version = version;
        self
    }

    /// Sets the application version stamped on records.
    #[must_use]
    pub fn schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = version.into();
        self
    }

    /// Sets the flat backend configuration.
    #[must_use]
    pub fn flat(mut self, flat: FlatConfig) -> Self {
        self.flat = flat;
        self
    }

    /// Sets the number of backups kept by automatic rotation.
    #[must_use]
    pub const fn backup_keep_count(mut self, count: usize) -> Self {
        self.backup_keep_count = count;
        self
    }

    /// Sets the minimum time between automatic backups.
    #[must_use]
    pub const fn auto_backup_interval(mut self, interval: Duration) -> Self {
        self.auto_backup_interval = interval;
        self
    }
}
