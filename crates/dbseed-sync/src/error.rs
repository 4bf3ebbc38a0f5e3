//! Error types for the sync module.

use std::path::PathBuf;

use thiserror::Error;

use dbseed_store::StoreError;

/// Errors that can occur during a sync run.
///
/// `StoreUnavailable` and `DirectoryUnreadable` abort the run before any
/// mutation. `UploadFailed` and `DeleteFailed` concern a single item; the
/// driver records them in the report and moves on.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The object store could not be listed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// The local directory could not be listed.
    #[error("directory {} unreadable: {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single upload failed.
    #[error("upload of {name} failed: {cause}")]
    UploadFailed { name: String, cause: String },

    /// A single delete failed.
    #[error("delete of {name} failed: {cause}")]
    DeleteFailed { name: String, cause: String },
}

impl SyncError {
    /// True for errors that abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::StoreUnavailable(_) | SyncError::DirectoryUnreadable { .. }
        )
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
