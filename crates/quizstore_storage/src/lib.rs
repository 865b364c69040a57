//! # QuizStore Storage
//!
//! Host storage abstraction and record backends for QuizStore.
//!
//! This crate provides the lowest-level storage layer. Backends store
//! **opaque records**: they never interpret payloads.
//!
//! ## Design Principles
//!
//! - Hosts are capabilities ([`FlatHost`], [`StructuredHost`]), not
//!   concrete platforms
//! - Both backends implement one async [`StorageBackend`] contract
//! - Corrupted records read as absent instead of failing the whole call
//! - No knowledge of migration, backups or health policy
//!
//! ## Available Backends
//!
//! - [`StructuredBackend`] - primary, over an async structured engine
//! - [`FlatBackend`] - fallback, over a sync flat key-value store
//!
//! ## Available Hosts
//!
//! - [`MemoryFlatHost`], [`MemoryStructuredHost`] - for tests and
//!   ephemeral installations
//! - [`FileFlatHost`] - a JSON file
//! - [`DirStructuredHost`] - a directory tree
//!
//! ## Example
//!
//! ```rust
//! use quizstore_storage::{Collection, FlatBackend, FlatConfig, MemoryFlatHost, Record, StorageBackend};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let backend = FlatBackend::new(Arc::new(MemoryFlatHost::new()), FlatConfig::default());
//! let record = Record::new("main", serde_json::json!({"a": 1}), "1.0.0");
//! backend.put(Collection::QuizData, record).await.unwrap();
//! let read = backend.get(Collection::QuizData, "main").await.unwrap();
//! assert_eq!(read.unwrap().payload, serde_json::json!({"a": 1}));
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod flat;
mod host;
mod record;
mod structured;
mod types;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use flat::{
    FlatBackend, FlatConfig, DEFAULT_CAPACITY, DEFAULT_WRITE_LIMIT, LEGACY_QUIZ_DATA_KEY,
    LEGACY_USER_PROGRESS_KEY,
};
pub use host::{
    DirStructuredHost, FileFlatHost, FlatHost, MemoryFlatHost, MemoryStructuredHost,
    StructuredHost,
};
pub use record::{Record, LEGACY_SCHEMA_VERSION};
pub use structured::StructuredBackend;
pub use types::{BackendKind, Collection, QuotaEstimate, CANONICAL_ID, SETTINGS_ID};
