//! Fault injection for store-level tests.
//!
//! [`FaultyStore`] forwards to an inner store and fails selected calls with
//! [`StoreError::Unavailable`].

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncRead;

use dbseed_core::{CollectionName, ObjectId, Record};
use dbseed_store::{
    BucketConfig, DeleteOutcome, ObjectInfo, ObjectStore, RecordStore, Result, StoreError,
};

const INJECTED: &str = "injected fault";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Once,
    Always,
}

/// A store wrapper that fails chosen operations on demand.
pub struct FaultyStore<S> {
    inner: S,
    unavailable: AtomicBool,
    uploads: Mutex<HashMap<String, Fault>>,
    deletes: Mutex<HashMap<String, Fault>>,
}

impl<S> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            unavailable: AtomicBool::new(false),
            uploads: Mutex::new(HashMap::new()),
            deletes: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fail the next upload of `name`.
    pub fn fail_upload_once(&self, name: &str) {
        arm(&self.uploads, name, Fault::Once);
    }

    /// Fail every upload of `name`.
    pub fn fail_upload_always(&self, name: &str) {
        arm(&self.uploads, name, Fault::Always);
    }

    /// Fail the next delete of `name`.
    pub fn fail_delete_once(&self, name: &str) {
        arm(&self.deletes, name, Fault::Once);
    }

    /// Make every call fail until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(INJECTED.into()));
        }
        Ok(())
    }
}

fn arm(table: &Mutex<HashMap<String, Fault>>, name: &str, fault: Fault) {
    table
        .lock()
        .expect("fault table lock")
        .insert(name.to_string(), fault);
}

/// Consume a fault for `name`, if one is armed.
fn trip(table: &Mutex<HashMap<String, Fault>>, name: &str) -> Result<()> {
    let mut table = table.lock().expect("fault table lock");
    match table.get(name).copied() {
        Some(Fault::Once) => {
            table.remove(name);
            Err(StoreError::Unavailable(INJECTED.into()))
        }
        Some(Fault::Always) => Err(StoreError::Unavailable(INJECTED.into())),
        None => Ok(()),
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for FaultyStore<S> {
    async fn bulk_insert(&self, collection: &CollectionName, records: Vec<Record>) -> Result<usize> {
        self.check_available()?;
        self.inner.bulk_insert(collection, records).await
    }

    async fn list_collections(&self) -> Result<BTreeSet<String>> {
        self.check_available()?;
        self.inner.list_collections().await
    }

    async fn drop_collection(&self, name: &str) -> Result<bool> {
        self.check_available()?;
        self.inner.drop_collection(name).await
    }

    async fn drop_all(&self) -> Result<()> {
        self.check_available()?;
        self.inner.drop_all().await
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        self.check_available()?;
        self.inner.count(collection).await
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Record>> {
        self.check_available()?;
        self.inner.find_all(collection).await
    }

    async fn next_seq(&self, counter: &str) -> Result<u64> {
        self.check_available()?;
        self.inner.next_seq(counter).await
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for FaultyStore<S> {
    fn bucket(&self) -> &BucketConfig {
        self.inner.bucket()
    }

    async fn list_objects(&self) -> Result<Vec<ObjectInfo>> {
        self.check_available()?;
        self.inner.list_objects().await
    }

    async fn find(&self, name: &str) -> Result<Option<ObjectInfo>> {
        self.check_available()?;
        self.inner.find(name).await
    }

    async fn upload(&self, name: &str, reader: &mut (dyn AsyncRead + Unpin + Send)) -> Result<ObjectId> {
        self.check_available()?;
        trip(&self.uploads, name)?;
        self.inner.upload(name, reader).await
    }

    async fn download(&self, name: &str) -> Result<Option<Bytes>> {
        self.check_available()?;
        self.inner.download(name).await
    }

    async fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        self.check_available()?;
        trip(&self.deletes, name)?;
        self.inner.delete(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbseed_store::{MemoryStore, ObjectStoreExt};

    #[tokio::test]
    async fn test_fail_upload_once() {
        let store = FaultyStore::new(MemoryStore::new());
        store.fail_upload_once("a");

        assert!(store.upload_bytes("a", b"1").await.is_err());
        assert!(store.upload_bytes("a", b"1").await.is_ok());
        assert_eq!(store.inner().count_copies("a").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fail_upload_always() {
        let store = FaultyStore::new(MemoryStore::new());
        store.fail_upload_always("a");

        assert!(store.upload_bytes("a", b"1").await.is_err());
        assert!(store.upload_bytes("a", b"1").await.is_err());
        assert!(store.upload_bytes("b", b"1").await.is_ok());
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = FaultyStore::new(MemoryStore::new());
        store.set_unavailable(true);
        assert!(matches!(store.list_names().await, Err(StoreError::Unavailable(_))));

        store.set_unavailable(false);
        assert!(store.list_names().await.unwrap().is_empty());
    }
}
