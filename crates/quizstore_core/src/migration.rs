//! One-time migration of legacy flat data into the structured backend.
//!
//! Installations that predate the structured backend keep their question
//! bank and progress under two flat keys. On the first structured start the
//! [`Migrator`] copies them across and records a [`MigrationFlag`] in flat
//! storage so the copy is attempted at most once per installation.
//!
//! ## State machine
//!
//! ```text
//! NotStarted -> Checked(AlreadyMigrated | AlreadyPopulated | NeedsMigration) -> Done
//! ```
//!
//! Legacy flat data is never deleted. A structured write failure aborts the
//! run before the flag is set, so the next start tries again.

use crate::config::StoreConfig;
use quizstore_storage::{
    Collection, FlatHost, Record, StorageBackend, StorageResult, CANONICAL_ID,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

const FLAG_SET: &str = "true";

/// The persisted "migration done" marker.
///
/// Lives in flat storage because it must be readable before the structured
/// backend is known to open.
#[derive(Clone)]
pub struct MigrationFlag {
    host: Arc<dyn FlatHost>,
    key: String,
}

impl MigrationFlag {
    /// Creates a flag stored under `key`.
    pub fn new(host: Arc<dyn FlatHost>, key: impl Into<String>) -> Self {
        Self {
            host,
            key: key.into(),
        }
    }

    /// Returns the flat key of the flag.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns true if migration has completed on this installation.
    pub fn is_set(&self) -> StorageResult<bool> {
        Ok(self.host.get_item(&self.key)?.as_deref() == Some(FLAG_SET))
    }

    /// Marks migration as completed.
    pub fn set(&self) -> StorageResult<()> {
        self.host.set_item(&self.key, FLAG_SET)
    }

    /// Removes the flag. Only a hard reset does this.
    pub fn clear(&self) -> StorageResult<()> {
        self.host.remove_item(&self.key)
    }
}

/// Result of inspecting an installation before migrating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MigrationCheck {
    /// The flag was already set.
    AlreadyMigrated,
    /// The structured backend already holds `quizData/main`.
    AlreadyPopulated,
    /// Legacy sources must be copied.
    NeedsMigration,
}

/// Progress of a [`Migrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    /// Nothing inspected yet.
    NotStarted,
    /// The installation was inspected.
    Checked(MigrationCheck),
    /// The flag is set and nothing remains to do.
    Done,
}

/// Why a legacy source was not copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "detail")]
pub enum SkipReason {
    /// The legacy key held nothing.
    Absent,
    /// The legacy value was not valid JSON.
    Unparseable(String),
}

/// A legacy key that was not copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedSource {
    /// The legacy flat key.
    pub key: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// What a migration run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// The decision taken after inspecting the installation.
    pub outcome: MigrationCheck,
    /// Collections whose canonical record was copied.
    pub migrated: Vec<Collection>,
    /// Legacy keys that were not copied.
    pub skipped: Vec<SkippedSource>,
}

impl MigrationReport {
    fn without_copy(outcome: MigrationCheck) -> Self {
        Self {
            outcome,
            migrated: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Copies legacy flat data into a structured backend.
pub struct Migrator {
    flag: MigrationFlag,
    sources: [(Collection, String); 2],
    schema_version: String,
    state: MigrationState,
}

impl Migrator {
    /// Creates a migrator reading legacy keys from `flat_host`.
    pub fn new(flat_host: Arc<dyn FlatHost>, config: &StoreConfig) -> Self {
        Self {
            flag: MigrationFlag::new(flat_host, config.migration_flag_key.clone()),
            sources: [
                (Collection::QuizData, config.flat.quiz_data_key.clone()),
                (Collection::UserProgress, config.flat.user_progress_key.clone()),
            ],
            schema_version: config.schema_version.clone(),
            state: MigrationState::NotStarted,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> MigrationState {
        self.state
    }

    /// Inspects the installation without copying anything.
    pub async fn check(&mut self, target: &dyn StorageBackend) -> StorageResult<MigrationCheck> {
        let check = if self.flag.is_set()? {
            MigrationCheck::AlreadyMigrated
        } else if target
            .get(Collection::QuizData, CANONICAL_ID)
            .await?
            .is_some()
        {
            MigrationCheck::AlreadyPopulated
        } else {
            MigrationCheck::NeedsMigration
        };

        debug!(?check, "migration check");
        self.state = MigrationState::Checked(check);
        Ok(check)
    }

    /// Runs the migration into `target`.
    ///
    /// Safe to call repeatedly: once the flag is set every later call
    /// reports [`MigrationCheck::AlreadyMigrated`] and copies nothing.
    ///
    /// # Errors
    ///
    /// Returns the error of a failed flag access or structured write. The
    /// flag stays unset in that case.
    pub async fn run(&mut self, target: &dyn StorageBackend) -> StorageResult<MigrationReport> {
        let check = match self.state {
            MigrationState::Checked(check) => check,
            MigrationState::NotStarted | MigrationState::Done => self.check(target).await?,
        };

        let report = match check {
            MigrationCheck::AlreadyMigrated => MigrationReport::without_copy(check),
            MigrationCheck::AlreadyPopulated => {
                info!("structured store already populated, skipping legacy import");
                self.flag.set()?;
                MigrationReport::without_copy(check)
            }
            MigrationCheck::NeedsMigration => {
                let report = self.copy_sources(target).await?;
                self.flag.set()?;
                info!(
                    migrated = report.migrated.len(),
                    skipped = report.skipped.len(),
                    "legacy flat data migrated"
                );
                report
            }
        };

        self.state = MigrationState::Done;
        Ok(report)
    }

    async fn copy_sources(&self, target: &dyn StorageBackend) -> StorageResult<MigrationReport> {
        let host = &self.flag.host;
        let mut report = MigrationReport::without_copy(MigrationCheck::NeedsMigration);

        for (collection, key) in &self.sources {
            let Some(raw) = host.get_item(key)? else {
                report.skipped.push(SkippedSource {
                    key: key.clone(),
                    reason: SkipReason::Absent,
                });
                continue;
            };

            let payload = match serde_json::from_str::<Value>(&raw) {
                Ok(payload) => payload,
                Err(e) => {
                    debug!(key = %key, error = %e, "legacy value is not JSON");
                    report.skipped.push(SkippedSource {
                        key: key.clone(),
                        reason: SkipReason::Unparseable(e.to_string()),
                    });
                    continue;
                }
            };

            let record = Record::new(CANONICAL_ID, payload, self.schema_version.as_str());
            target.put(*collection, record).await?;
            report.migrated.push(*collection);
        }

        Ok(report)
    }
}
