//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The host lacks a required storage capability.
    ///
    /// Raised while opening the structured backend; the router recovers
    /// from it by selecting the flat backend.
    #[error("storage capability unsupported: {0}")]
    Unsupported(String),

    /// An operation was attempted before `init()` completed.
    #[error("store is not initialized")]
    NotInitialized,

    /// The underlying host storage failed to open, read or write.
    #[error("backend error: {message}")]
    Backend {
        /// Description of the host failure.
        message: String,
    },

    /// A write was rejected because of size or capacity.
    #[error("quota exceeded: {message}")]
    QuotaExceeded {
        /// Description of the rejected write.
        message: String,
    },

    /// A payload could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the codec failure.
        message: String,
    },

    /// The requested record does not exist.
    #[error("not found: {collection}/{id}")]
    NotFound {
        /// Collection that was searched.
        collection: String,
        /// Id that was not found.
        id: String,
    },

    /// A record id was empty.
    #[error("invalid id for collection {collection}: ids must not be empty")]
    InvalidId {
        /// Collection the id was used with.
        collection: String,
    },

    /// A collection name did not match any known collection.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// Stored data failed an integrity check.
    #[error("corrupted data: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },
}

impl StorageError {
    /// Creates an unsupported-capability error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates a quota exceeded error.
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::QuotaExceeded {
            message: message.into(),
        }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Creates a corrupted data error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Returns true if a write was refused for size or capacity reasons.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// Returns true if the error reports a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        Self::backend(err.to_string())
    }
}
