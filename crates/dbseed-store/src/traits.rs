//! Store traits: the abstract interface for records and bucket objects.
//!
//! These traits keep the seeder storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use dbseed_core::{validate_collection_name, CollectionName, ObjectId, Record};

use crate::error::{Result, StoreError};

/// Default bucket name.
pub const DEFAULT_BUCKET: &str = "upload";

/// Default chunk size: 255 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 255 * 1024;

/// Largest accepted chunk size: 16 MiB.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Bucket settings a store handle is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Bucket name. Objects in other buckets are invisible to this handle.
    pub name: String,
    /// Size of every chunk except the last, in bytes.
    pub chunk_size: usize,
}

impl BucketConfig {
    /// Create a bucket config with the default chunk size.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Override the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Check the bucket name and chunk size.
    pub fn validate(&self) -> Result<()> {
        validate_collection_name(&self.name)
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))?;
        if self.chunk_size == 0 {
            return Err(StoreError::InvalidConfig("chunk size must be positive".into()));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(StoreError::InvalidConfig(format!(
                "chunk size {} exceeds {}",
                self.chunk_size, MAX_CHUNK_SIZE
            )));
        }
        Ok(())
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_BUCKET.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Opaque identifier; distinguishes objects sharing a name.
    pub id: ObjectId,
    /// Object name.
    pub name: String,
    /// Content length in bytes.
    pub length: u64,
    /// Chunk size used when the object was written.
    pub chunk_size: u32,
    /// Upload completion time (Unix ms).
    pub uploaded_at: i64,
    /// Hex Blake3 digest of the content.
    pub checksum: String,
}

impl ObjectInfo {
    /// Number of chunks the content was split into.
    pub fn chunk_count(&self) -> u64 {
        if self.chunk_size == 0 {
            return 0;
        }
        self.length.div_ceil(self.chunk_size as u64)
    }
}

/// Result of deleting an object by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The object with this id and all its chunks were removed.
    Deleted(ObjectId),
    /// No object had that name; nothing changed.
    NotFound,
}

impl DeleteOutcome {
    /// True if something was removed.
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted(_))
    }
}

/// Structured record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert records into a collection, creating it if needed.
    ///
    /// Returns the number of records inserted. Inserting an empty slice is a
    /// no-op and does not create the collection.
    async fn bulk_insert(&self, collection: &CollectionName, records: Vec<Record>) -> Result<usize>;

    /// Names of all record collections.
    async fn list_collections(&self) -> Result<BTreeSet<String>>;

    /// Drop a collection and reset its sequence counter.
    ///
    /// Returns false if the collection did not exist.
    async fn drop_collection(&self, name: &str) -> Result<bool>;

    /// Drop every collection, every counter, and every bucket object.
    async fn drop_all(&self) -> Result<()>;

    /// Number of records in a collection.
    async fn count(&self, collection: &str) -> Result<u64>;

    /// All records of a collection, in insertion order.
    async fn find_all(&self, collection: &str) -> Result<Vec<Record>>;

    /// Advance a named counter and return its new value. Starts at 1.
    async fn next_seq(&self, counter: &str) -> Result<u64>;
}

/// Chunked object bucket.
///
/// All methods re-query the backend; nothing is cached between calls.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// The bucket this handle reads and writes.
    fn bucket(&self) -> &BucketConfig;

    /// Every stored object, oldest upload first. Duplicated names appear
    /// once per stored copy.
    async fn list_objects(&self) -> Result<Vec<ObjectInfo>>;

    /// Distinct names of all stored objects.
    async fn list_names(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .list_objects()
            .await?
            .into_iter()
            .map(|info| info.name)
            .collect())
    }

    /// The newest object stored under `name`.
    async fn find(&self, name: &str) -> Result<Option<ObjectInfo>>;

    /// Stream `reader` into a new object named `name`.
    ///
    /// Completes only after the reader reaches EOF and the metadata is
    /// written. Does not check whether `name` already exists.
    async fn upload(&self, name: &str, reader: &mut (dyn AsyncRead + Unpin + Send)) -> Result<ObjectId>;

    /// Content of the newest object stored under `name`.
    async fn download(&self, name: &str) -> Result<Option<Bytes>>;

    /// Remove the oldest object stored under `name` with all its chunks.
    ///
    /// Only one copy goes per call. A name stored twice needs two deletes,
    /// so an `update` run over a bucket holding duplicates of a stale name
    /// leaves the newer copies for the following runs.
    async fn delete(&self, name: &str) -> Result<DeleteOutcome>;
}

/// Extension trait for common object store patterns.
pub trait ObjectStoreExt: ObjectStore {
    /// Upload an in-memory buffer.
    fn upload_bytes(
        &self,
        name: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<ObjectId>> + Send;

    /// Number of stored copies of `name`.
    fn count_copies(&self, name: &str) -> impl std::future::Future<Output = Result<usize>> + Send;
}

impl<S: ObjectStore + ?Sized> ObjectStoreExt for S {
    async fn upload_bytes(&self, name: &str, data: &[u8]) -> Result<ObjectId> {
        let mut reader = data;
        self.upload(name, &mut reader).await
    }

    async fn count_copies(&self, name: &str) -> Result<usize> {
        Ok(self
            .list_objects()
            .await?
            .iter()
            .filter(|info| info.name == name)
            .count())
    }
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    async fn bulk_insert(&self, collection: &CollectionName, records: Vec<Record>) -> Result<usize> {
        (**self).bulk_insert(collection, records).await
    }

    async fn list_collections(&self) -> Result<BTreeSet<String>> {
        (**self).list_collections().await
    }

    async fn drop_collection(&self, name: &str) -> Result<bool> {
        (**self).drop_collection(name).await
    }

    async fn drop_all(&self) -> Result<()> {
        (**self).drop_all().await
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        (**self).count(collection).await
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Record>> {
        (**self).find_all(collection).await
    }

    async fn next_seq(&self, counter: &str) -> Result<u64> {
        (**self).next_seq(counter).await
    }
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    fn bucket(&self) -> &BucketConfig {
        (**self).bucket()
    }

    async fn list_objects(&self) -> Result<Vec<ObjectInfo>> {
        (**self).list_objects().await
    }

    async fn list_names(&self) -> Result<BTreeSet<String>> {
        (**self).list_names().await
    }

    async fn find(&self, name: &str) -> Result<Option<ObjectInfo>> {
        (**self).find(name).await
    }

    async fn upload(&self, name: &str, reader: &mut (dyn AsyncRead + Unpin + Send)) -> Result<ObjectId> {
        (**self).upload(name, reader).await
    }

    async fn download(&self, name: &str) -> Result<Option<Bytes>> {
        (**self).download(name).await
    }

    async fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        (**self).delete(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_defaults() {
        let bucket = BucketConfig::default();
        assert_eq!(bucket.name, "upload");
        assert_eq!(bucket.chunk_size, 261_120);
        assert!(bucket.validate().is_ok());
    }

    #[test]
    fn test_bucket_rejects_zero_chunk() {
        let bucket = BucketConfig::named("files").with_chunk_size(0);
        assert!(matches!(bucket.validate(), Err(StoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_bucket_caps_chunk_size() {
        assert!(BucketConfig::default().with_chunk_size(MAX_CHUNK_SIZE).validate().is_ok());
        let bucket = BucketConfig::default().with_chunk_size(u32::MAX as usize);
        assert!(matches!(bucket.validate(), Err(StoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_bucket_rejects_bad_name() {
        assert!(BucketConfig::named("").validate().is_err());
        assert!(BucketConfig::named("up$load").validate().is_err());
    }

    #[test]
    fn test_chunk_count() {
        let info = ObjectInfo {
            id: ObjectId::from_bytes([1; 12]),
            name: "a".into(),
            length: 10,
            chunk_size: 4,
            uploaded_at: 0,
            checksum: String::new(),
        };
        assert_eq!(info.chunk_count(), 3);
    }
}
