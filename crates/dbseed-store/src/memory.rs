//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::AsyncRead;

use dbseed_core::{CollectionName, ObjectId, Record};

use crate::chunk::{checksum, ChunkReader};
use crate::error::{Result, StoreError};
use crate::sqlite::now_millis;
use crate::traits::{BucketConfig, DeleteOutcome, ObjectInfo, ObjectStore, RecordStore};

/// In-memory store implementation.
///
/// All data is lost when the last handle is dropped. Thread-safe via RwLock.
/// Handles made with [`MemoryStore::with_bucket`] share the same data.
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
    bucket: BucketConfig,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Records by collection, in insertion order.
    collections: BTreeMap<String, Vec<Record>>,

    /// Sequence counters.
    counters: HashMap<String, u64>,

    /// Bucket objects, oldest first.
    objects: Vec<StoredObject>,
}

struct StoredObject {
    bucket: String,
    info: ObjectInfo,
    chunks: Vec<Bytes>,
}

impl MemoryStore {
    /// Create a new empty in-memory store bound to the default bucket.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryStoreInner::default())),
            bucket: BucketConfig::default(),
        }
    }

    /// Create an empty store bound to `bucket`.
    pub fn with_config(bucket: BucketConfig) -> Result<Self> {
        bucket.validate()?;
        Ok(Self {
            inner: Arc::new(RwLock::new(MemoryStoreInner::default())),
            bucket,
        })
    }

    /// Another handle on the same data, bound to a different bucket.
    pub fn with_bucket(&self, bucket: BucketConfig) -> Result<Self> {
        bucket.validate()?;
        Ok(Self {
            inner: Arc::clone(&self.inner),
            bucket,
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("store lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("store lock poisoned: {}", e)))
    }

    fn newest<'a>(&self, inner: &'a MemoryStoreInner, name: &str) -> Option<&'a StoredObject> {
        inner
            .objects
            .iter()
            .rev()
            .find(|o| o.bucket == self.bucket.name && o.info.name == name)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn bulk_insert(&self, collection: &CollectionName, records: Vec<Record>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let count = records.len();
        let mut inner = self.write()?;
        let mut taken: HashSet<String> = inner
            .collections
            .get(collection.as_str())
            .into_iter()
            .flatten()
            .filter_map(Record::id_key)
            .collect();
        for key in records.iter().filter_map(Record::id_key) {
            if !taken.insert(key.clone()) {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    id: key,
                });
            }
        }

        inner
            .collections
            .entry(collection.as_str().to_string())
            .or_default()
            .extend(records);
        Ok(count)
    }

    async fn list_collections(&self) -> Result<BTreeSet<String>> {
        Ok(self.read()?.collections.keys().cloned().collect())
    }

    async fn drop_collection(&self, name: &str) -> Result<bool> {
        let mut inner = self.write()?;
        inner.counters.remove(name);
        Ok(inner.collections.remove(name).is_some())
    }

    async fn drop_all(&self) -> Result<()> {
        let mut inner = self.write()?;
        inner.collections.clear();
        inner.counters.clear();
        inner.objects.clear();
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        Ok(self
            .read()?
            .collections
            .get(collection)
            .map(|r| r.len() as u64)
            .unwrap_or(0))
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Record>> {
        Ok(self
            .read()?
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn next_seq(&self, counter: &str) -> Result<u64> {
        let mut inner = self.write()?;
        let value = inner.counters.entry(counter.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &BucketConfig {
        &self.bucket
    }

    async fn list_objects(&self) -> Result<Vec<ObjectInfo>> {
        Ok(self
            .read()?
            .objects
            .iter()
            .filter(|o| o.bucket == self.bucket.name)
            .map(|o| o.info.clone())
            .collect())
    }

    async fn find(&self, name: &str) -> Result<Option<ObjectInfo>> {
        let inner = self.read()?;
        Ok(self.newest(&inner, name).map(|o| o.info.clone()))
    }

    async fn upload(&self, name: &str, reader: &mut (dyn AsyncRead + Unpin + Send)) -> Result<ObjectId> {
        let id = ObjectId::generate();
        let mut reader = ChunkReader::new(reader, self.bucket.chunk_size);
        let mut chunks = Vec::new();
        while let Some(chunk) = reader.next_chunk().await? {
            chunks.push(chunk);
        }
        let summary = reader.summary();

        let object = StoredObject {
            bucket: self.bucket.name.clone(),
            info: ObjectInfo {
                id,
                name: name.to_string(),
                length: summary.length,
                chunk_size: self.bucket.chunk_size as u32,
                uploaded_at: now_millis(),
                checksum: summary.checksum,
            },
            chunks,
        };
        self.write()?.objects.push(object);
        Ok(id)
    }

    async fn download(&self, name: &str) -> Result<Option<Bytes>> {
        let inner = self.read()?;
        let Some(object) = self.newest(&inner, name) else {
            return Ok(None);
        };

        let mut content = BytesMut::with_capacity(object.info.length as usize);
        for chunk in &object.chunks {
            content.extend_from_slice(chunk);
        }

        let actual = checksum(&content);
        if actual != object.info.checksum {
            return Err(StoreError::ChecksumMismatch {
                name: object.info.name.clone(),
                expected: object.info.checksum.clone(),
                actual,
            });
        }
        Ok(Some(content.freeze()))
    }

    async fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        let mut inner = self.write()?;
        let position = inner
            .objects
            .iter()
            .position(|o| o.bucket == self.bucket.name && o.info.name == name);

        match position {
            Some(index) => {
                let removed = inner.objects.remove(index);
                Ok(DeleteOutcome::Deleted(removed.info.id))
            }
            None => Ok(DeleteOutcome::NotFound),
        }
    }
}
