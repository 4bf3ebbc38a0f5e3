//! Error types for the seeding process.

use std::path::PathBuf;

use dbseed_core::CoreError;
use dbseed_store::StoreError;
use dbseed_sync::SyncError;
use thiserror::Error;

/// Errors that abort a seeding run.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Storage error while resetting or inserting.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Fatal sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Seed data did not validate.
    #[error("invalid seed data: {0}")]
    Core(#[from] CoreError),

    /// The seed data file exists but could not be read.
    #[error("cannot read seed data {}: {source}", path.display())]
    DataFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for seeding operations.
pub type Result<T> = std::result::Result<T, SeedError>;
