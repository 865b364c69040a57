//! Backup commands.
//!
//! Backups live in the store's `backup` collection, so they are created and
//! restored on whichever backend the installation selected.

use quizstore_core::QuizStore;
use tracing::info;

/// Creates a backup of the question bank and progress.
pub async fn create(
    store: &QuizStore,
    name: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = store.create_backup(name).await?;
    let backup = store
        .get_backup(&id)
        .await?
        .ok_or("Backup was written but cannot be read back")?;

    println!("✓ Backup created successfully");
    println!("  Id: {}", backup.id);
    println!("  Size: {}", backup.summary().display_size());
    println!("  Created: {}", backup.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Checksum: {}", backup.checksum);
    Ok(())
}

/// Lists backups newest first.
pub async fn list(store: &QuizStore) -> Result<(), Box<dyn std::error::Error>> {
    let backups = store.try_list_backups().await?;
    if backups.is_empty() {
        println!("No backups");
        return Ok(());
    }

    println!("{} backup(s):", backups.len());
    for backup in &backups {
        println!(
            "  {:<28} {}  {:>10}  [{}]",
            backup.id,
            backup.created_at.format("%Y-%m-%d %H:%M:%S"),
            backup.display_size(),
            backup.collections.join(", ")
        );
    }
    Ok(())
}

/// Restores live data from a backup.
pub async fn restore(store: &QuizStore, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("Restoring from backup {}", id);
    store.restore_backup(id).await?;
    println!("✓ Restored from backup {id}");
    Ok(())
}

/// Deletes all but the `keep` newest backups.
pub async fn cleanup(store: &QuizStore, keep: usize) -> Result<(), Box<dyn std::error::Error>> {
    let removed = store.cleanup_backups(keep).await?;
    println!("✓ Removed {removed} old backup(s), kept up to {keep}");
    Ok(())
}
