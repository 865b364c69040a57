//! Info command implementation.

use quizstore_core::{QuizStore, SkipReason};
use quizstore_storage::Collection;
use std::path::Path;

/// Runs the info command.
pub async fn run(store: &QuizStore, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Installation: {}", dir.display());
    match store.backend_kind() {
        Some(kind) => println!("Backend: {kind}"),
        None => println!("Backend: not initialized"),
    }
    if let Some(reason) = store.fallback_reason() {
        println!("  Fallback reason: {reason}");
    }

    match store.migration_report() {
        Some(report) => {
            println!("Migration: {:?}", report.outcome);
            for collection in &report.migrated {
                println!("  ✓ migrated {collection}");
            }
            for skipped in &report.skipped {
                match &skipped.reason {
                    SkipReason::Absent => println!("  - {} absent", skipped.key),
                    SkipReason::Unparseable(e) => {
                        println!("  - {} unparseable: {}", skipped.key, e);
                    }
                }
            }
        }
        None => println!("Migration: not run"),
    }

    println!();
    println!("Collections:");
    for collection in Collection::ALL {
        let records = store.list_all(collection).await?;
        println!("  {:<14} {:>6} record(s)", collection.as_str(), records.len());
    }

    let stats = store.stats();
    println!();
    println!(
        "Operations: {} read(s), {} write(s), {} scan(s), {} error(s)",
        stats.reads, stats.writes, stats.scans, stats.errors
    );
    Ok(())
}
