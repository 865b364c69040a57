//! CLI command implementations.

pub mod backup;
pub mod data;
pub mod export;
pub mod health;
pub mod info;
pub mod reset;

use quizstore_core::{QuizStore, StoreConfig};
use quizstore_storage::{Collection, DirStructuredHost, FileFlatHost, FlatHost, StructuredHost};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Flat storage file inside an installation directory.
pub const FLAT_FILE: &str = "flat.json";

/// Structured storage directory inside an installation directory.
pub const STRUCTURED_DIR: &str = "structured";

/// Returns the flat file and structured directory paths for `dir`.
pub fn layout(dir: &Path) -> (PathBuf, PathBuf) {
    (dir.join(FLAT_FILE), dir.join(STRUCTURED_DIR))
}

/// Opens and initializes the store of an installation.
pub async fn open_store(
    dir: &Path,
    flat_only: bool,
) -> Result<QuizStore, Box<dyn std::error::Error>> {
    let (flat_path, structured_path) = layout(dir);
    debug!(?flat_path, ?structured_path, flat_only, "opening installation");

    let flat: Arc<dyn FlatHost> = Arc::new(FileFlatHost::open(&flat_path)?);
    let structured: Option<Arc<dyn StructuredHost>> = if flat_only {
        None
    } else {
        Some(Arc::new(DirStructuredHost::new(structured_path)))
    };

    let store = QuizStore::new(flat, structured, StoreConfig::default());
    store.init().await?;
    Ok(store)
}

/// Parses a collection name given on the command line.
pub fn parse_collection(name: &str) -> Result<Collection, Box<dyn std::error::Error>> {
    name.parse::<Collection>().map_err(|_| {
        format!(
            "Unknown collection '{}'. Expected one of: {}",
            name,
            Collection::ALL.map(Collection::as_str).join(", ")
        )
        .into()
    })
}
