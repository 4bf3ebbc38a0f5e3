//! Errors from the record store and the object bucket.

use thiserror::Error;

/// Errors returned by [`RecordStore`](crate::RecordStore) and
/// [`ObjectStore`](crate::ObjectStore) implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Record serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored object content does not match the checksum recorded at upload.
    #[error("checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// A record's `_id` is already used in its collection.
    #[error("duplicate _id {id} in collection {collection}")]
    DuplicateKey { collection: String, id: String },

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Invalid store or bucket configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A blocking database task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Background(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the store crate.
pub type Result<T> = std::result::Result<T, StoreError>;
