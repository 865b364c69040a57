//! Export command implementation.

use quizstore_core::QuizStore;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Writes all canonical records to `output` as pretty JSON.
pub async fn run(store: &QuizStore, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!("Exporting to {:?}", output);
    let bundle = store.export_all().await?;
    let json = bundle.to_json_pretty()?;

    let mut file = fs::File::create(output)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;

    println!("✓ Export written successfully");
    println!("  Path: {:?}", output);
    println!("  Size: {} bytes", json.len());
    println!("  Storage: {}", bundle.storage_type);
    Ok(())
}
