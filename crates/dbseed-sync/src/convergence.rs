//! Convergence verification.
//!
//! After an `UpdateOnly` run the set of stored names should equal the set
//! of local names. These checks compare the two without mutating either.

use std::collections::BTreeMap;

use serde::Serialize;

use dbseed_store::ObjectStore;

use crate::error::{Result, SyncError};
use crate::local::LocalDirectory;

/// Result of comparing a bucket against a local directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ConvergenceResult {
    /// Stored names equal local names.
    Converged,
    /// The name sets differ.
    Diverged {
        /// Local names with no stored object.
        missing: Vec<String>,
        /// Stored names with no local file.
        extra: Vec<String>,
    },
}

impl ConvergenceResult {
    /// Check if the two sides have converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceResult::Converged)
    }
}

/// Compare stored names with local names.
///
/// Comparison is by name only, matching how plans are computed.
pub async fn verify_convergence<S: ObjectStore>(
    store: &S,
    source: &LocalDirectory,
) -> Result<ConvergenceResult> {
    let stored = store
        .list_names()
        .await
        .map_err(SyncError::StoreUnavailable)?;
    let local = source.list_names().await?;

    if stored == local {
        return Ok(ConvergenceResult::Converged);
    }

    Ok(ConvergenceResult::Diverged {
        missing: local.difference(&stored).cloned().collect(),
        extra: stored.difference(&local).cloned().collect(),
    })
}

/// Names stored more than once, with their copy counts.
pub async fn find_duplicates<S: ObjectStore>(store: &S) -> Result<Vec<(String, usize)>> {
    let objects = store
        .list_objects()
        .await
        .map_err(SyncError::StoreUnavailable)?;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for object in objects {
        *counts.entry(object.name).or_default() += 1;
    }

    Ok(counts.into_iter().filter(|(_, n)| *n > 1).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbseed_store::{MemoryStore, ObjectStoreExt};

    #[tokio::test]
    async fn test_converged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"a").unwrap();

        let store = MemoryStore::new();
        store.upload_bytes("a", b"other content").await.unwrap();

        let result = verify_convergence(&store, &LocalDirectory::new(dir.path()))
            .await
            .unwrap();
        assert!(result.is_converged());
    }

    #[tokio::test]
    async fn test_diverged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b"), b"b").unwrap();

        let store = MemoryStore::new();
        store.upload_bytes("a", b"a").await.unwrap();

        let result = verify_convergence(&store, &LocalDirectory::new(dir.path()))
            .await
            .unwrap();
        assert_eq!(
            result,
            ConvergenceResult::Diverged {
                missing: vec!["b".into()],
                extra: vec!["a".into()],
            }
        );
    }

    #[tokio::test]
    async fn test_find_duplicates() {
        let store = MemoryStore::new();
        store.upload_bytes("a", b"1").await.unwrap();
        store.upload_bytes("a", b"2").await.unwrap();
        store.upload_bytes("b", b"3").await.unwrap();

        let dups = find_duplicates(&store).await.unwrap();
        assert_eq!(dups, vec![("a".to_string(), 2)]);
    }
}
