//! Reset command implementation.

use quizstore_core::QuizStore;
use tracing::warn;

/// Refuses to go further unless the reset was confirmed.
///
/// Checked before the store is opened, so an unconfirmed reset never takes
/// the installation lock or runs init.
pub fn confirm(yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    if yes {
        Ok(())
    } else {
        Err("Reset removes all data. Pass --yes to confirm.".into())
    }
}

/// Removes every record, legacy key and flag.
pub async fn run(store: &QuizStore) -> Result<(), Box<dyn std::error::Error>> {
    warn!("Resetting all data");
    store.hard_reset().await?;
    println!("✓ All data removed");
    Ok(())
}
