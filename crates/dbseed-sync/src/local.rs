//! Local file source: the directory whose files are mirrored into the bucket.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Result, SyncError};

/// A regular file found in the local directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalFile {
    /// File name, used as the object name.
    pub name: String,
    /// Full path on disk.
    pub path: PathBuf,
    /// Size in bytes at listing time.
    pub size: u64,
}

/// A local directory read by the synchronizer. Never written to.
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    root: PathBuf,
}

impl LocalDirectory {
    /// Point at a directory. Existence is checked at listing time.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a file in this directory.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Regular files directly inside the directory, sorted by name.
    ///
    /// Subdirectories are skipped; symlinks are followed. Names that are
    /// not valid UTF-8 are skipped with a warning.
    pub async fn list_files(&self) -> Result<Vec<LocalFile>> {
        let unreadable = |source| SyncError::DirectoryUnreadable {
            path: self.root.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(unreadable)?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
            let path = entry.path();
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(path = %path.display(), "skipping file with non UTF-8 name");
                continue;
            };

            let metadata = match tokio::fs::metadata(&path).await {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !metadata.is_file() {
                tracing::debug!(name, "skipping non-file entry");
                continue;
            }

            files.push(LocalFile {
                name,
                path,
                size: metadata.len(),
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Names of the regular files in the directory.
    pub async fn list_names(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .list_files()
            .await?
            .into_iter()
            .map(|f| f.name)
            .collect())
    }

    /// Open a file for reading.
    pub async fn open(&self, name: &str) -> std::io::Result<tokio::fs::File> {
        tokio::fs::File::open(self.path_of(name)).await
    }
}
