//! SQLite implementation of the store traits.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::io::AsyncRead;

use dbseed_core::{CollectionName, ObjectId, Record};

use crate::chunk::{checksum, ChunkReader};
use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{BucketConfig, DeleteOutcome, ObjectInfo, ObjectStore, RecordStore};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
    /// Bucket this handle reads and writes.
    bucket: BucketConfig,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>, bucket: BucketConfig) -> Result<Self> {
        bucket.validate()?;
        let path = path.as_ref();
        let mut conn = Connection::open(path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e)))?;
        migration::migrate(&mut conn)?;
        tracing::debug!(path = %path.display(), bucket = %bucket.name, "opened sqlite store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            bucket,
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory(bucket: BucketConfig) -> Result<Self> {
        bucket.validate()?;
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            bucket,
        })
    }

    /// Another handle on the same database, bound to a different bucket.
    pub fn with_bucket(&self, bucket: BucketConfig) -> Result<Self> {
        bucket.validate()?;
        Ok(Self {
            conn: Arc::clone(&self.conn),
            bucket,
        })
    }

    /// Run a blocking operation on the connection.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Background(e.to_string()))?
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| StoreError::Unavailable(format!("connection mutex poisoned: {}", e)))
}

// Helper to convert a bucket_files row to ObjectInfo
fn row_to_info(row: &rusqlite::Row<'_>) -> rusqlite::Result<ObjectInfo> {
    let id_bytes: Vec<u8> = row.get("id")?;
    let id = ObjectId::try_from(id_bytes.as_slice()).map_err(|_| {
        rusqlite::Error::InvalidColumnType(0, "id".into(), rusqlite::types::Type::Blob)
    })?;

    Ok(ObjectInfo {
        id,
        name: row.get("filename")?,
        length: row.get::<_, i64>("length")? as u64,
        chunk_size: row.get::<_, i64>("chunk_size")? as u32,
        uploaded_at: row.get("uploaded_at")?,
        checksum: row.get("checksum")?,
    })
}

const INFO_COLUMNS: &str = "id, filename, length, chunk_size, uploaded_at, checksum";

fn encode_record(record: &Record) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(record, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_record(bytes: &[u8]) -> Result<Record> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn bulk_insert(&self, collection: &CollectionName, records: Vec<Record>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let name = collection.as_str().to_string();
        let rows = records
            .iter()
            .map(|r| -> Result<_> { Ok((r.id_key(), encode_record(r)?)) })
            .collect::<Result<Vec<_>>>()?;

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO collections (name, created_at) VALUES (?1, ?2)",
                params![name, now_millis()],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO documents (collection, id_key, body) VALUES (?1, ?2, ?3)",
                )?;
                for (id_key, body) in &rows {
                    match stmt.execute(params![name, id_key, body]) {
                        Ok(_) => {}
                        Err(rusqlite::Error::SqliteFailure(e, _))
                            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                        {
                            // Dropping the transaction rolls back the batch.
                            return Err(StoreError::DuplicateKey {
                                collection: name.clone(),
                                id: id_key.clone().unwrap_or_default(),
                            });
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            tx.commit()?;
            Ok(rows.len())
        })
        .await
    }

    async fn list_collections(&self) -> Result<BTreeSet<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM collections")?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<BTreeSet<String>>>()?;
            Ok(names)
        })
        .await
    }

    async fn drop_collection(&self, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let existed = tx.execute("DELETE FROM collections WHERE name = ?1", params![name])? > 0;
            tx.execute("DELETE FROM documents WHERE collection = ?1", params![name])?;
            tx.execute("DELETE FROM counters WHERE name = ?1", params![name])?;
            tx.commit()?;
            Ok(existed)
        })
        .await
    }

    async fn drop_all(&self) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute_batch(
                "DELETE FROM documents;
                 DELETE FROM collections;
                 DELETE FROM counters;
                 DELETE FROM bucket_chunks;
                 DELETE FROM bucket_files;",
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        let collection = collection.to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Record>> {
        let collection = collection.to_string();
        self.with_conn(move |conn| {
            let mut stmt =
                conn.prepare("SELECT body FROM documents WHERE collection = ?1 ORDER BY id")?;
            let bodies = stmt
                .query_map(params![collection], |row| row.get::<_, Vec<u8>>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            bodies.iter().map(|b| decode_record(b)).collect()
        })
        .await
    }

    async fn next_seq(&self, counter: &str) -> Result<u64> {
        let counter = counter.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO counters (name, value) VALUES (?1, 1)
                 ON CONFLICT(name) DO UPDATE SET value = value + 1",
                params![counter],
            )?;
            let value: i64 = tx.query_row(
                "SELECT value FROM counters WHERE name = ?1",
                params![counter],
                |row| row.get(0),
            )?;
            tx.commit()?;
            Ok(value as u64)
        })
        .await
    }
}

#[async_trait]
impl ObjectStore for SqliteStore {
    fn bucket(&self) -> &BucketConfig {
        &self.bucket
    }

    async fn list_objects(&self) -> Result<Vec<ObjectInfo>> {
        let bucket = self.bucket.name.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM bucket_files WHERE bucket = ?1 ORDER BY rowid",
                INFO_COLUMNS
            ))?;
            let infos = stmt
                .query_map(params![bucket], row_to_info)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(infos)
        })
        .await
    }

    async fn find(&self, name: &str) -> Result<Option<ObjectInfo>> {
        let bucket = self.bucket.name.clone();
        let name = name.to_string();
        self.with_conn(move |conn| {
            find_newest(conn, &bucket, &name)
        })
        .await
    }

    async fn upload(&self, name: &str, reader: &mut (dyn AsyncRead + Unpin + Send)) -> Result<ObjectId> {
        let id = ObjectId::generate();
        let chunk_size = self.bucket.chunk_size;
        let mut chunks = ChunkReader::new(reader, chunk_size);
        let mut n: u32 = 0;

        // Chunks land as they are read; the metadata row is written last so a
        // failed upload never shows up in listings.
        while let Some(chunk) = chunks.next_chunk().await? {
            let index = n;
            self.with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO bucket_chunks (files_id, n, data) VALUES (?1, ?2, ?3)",
                    params![id.as_bytes().as_slice(), index, chunk.as_ref()],
                )?;
                Ok(())
            })
            .await?;
            n += 1;
        }

        let summary = chunks.summary();
        let bucket = self.bucket.name.clone();
        let filename = name.to_string();
        let uploaded_at = now_millis();
        let checksum = summary.checksum.clone();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO bucket_files (id, bucket, filename, length, chunk_size, checksum, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.as_bytes().as_slice(),
                    bucket,
                    filename,
                    summary.length as i64,
                    chunk_size as i64,
                    checksum,
                    uploaded_at,
                ],
            )?;
            Ok(())
        })
        .await?;

        tracing::debug!(
            bucket = %self.bucket.name,
            name,
            id = %id,
            length = summary.length,
            chunks = summary.chunks,
            "stored object"
        );
        Ok(id)
    }

    async fn download(&self, name: &str) -> Result<Option<Bytes>> {
        let bucket = self.bucket.name.clone();
        let name = name.to_string();
        self.with_conn(move |conn| {
            let Some(info) = find_newest(conn, &bucket, &name)? else {
                return Ok(None);
            };

            let mut stmt =
                conn.prepare("SELECT n, data FROM bucket_chunks WHERE files_id = ?1 ORDER BY n")?;
            let rows = stmt
                .query_map(params![info.id.as_bytes().as_slice()], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut content = BytesMut::with_capacity(info.length as usize);
            for (expected, (n, data)) in rows.iter().enumerate() {
                if *n != expected as i64 {
                    return Err(StoreError::InvalidData(format!(
                        "object {} ({}) is missing chunk {}",
                        info.name, info.id, expected
                    )));
                }
                content.extend_from_slice(data);
            }

            if rows.len() as u64 != info.chunk_count() || content.len() as u64 != info.length {
                return Err(StoreError::InvalidData(format!(
                    "object {} ({}) has {} bytes in {} chunks, expected {} bytes",
                    info.name,
                    info.id,
                    content.len(),
                    rows.len(),
                    info.length
                )));
            }

            let actual = checksum(&content);
            if actual != info.checksum {
                return Err(StoreError::ChecksumMismatch {
                    name: info.name,
                    expected: info.checksum,
                    actual,
                });
            }

            Ok(Some(content.freeze()))
        })
        .await
    }

    async fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        let bucket = self.bucket.name.clone();
        let name = name.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let oldest: Option<Vec<u8>> = tx
                .query_row(
                    "SELECT id FROM bucket_files WHERE bucket = ?1 AND filename = ?2
                     ORDER BY rowid LIMIT 1",
                    params![bucket, name],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(id_bytes) = oldest else {
                return Ok(DeleteOutcome::NotFound);
            };
            let id = ObjectId::try_from(id_bytes.as_slice())
                .map_err(|e| StoreError::InvalidData(e.to_string()))?;

            tx.execute("DELETE FROM bucket_chunks WHERE files_id = ?1", params![id_bytes])?;
            tx.execute("DELETE FROM bucket_files WHERE id = ?1", params![id_bytes])?;
            tx.commit()?;

            Ok(DeleteOutcome::Deleted(id))
        })
        .await
    }
}

fn find_newest(conn: &Connection, bucket: &str, name: &str) -> Result<Option<ObjectInfo>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM bucket_files WHERE bucket = ?1 AND filename = ?2
             ORDER BY rowid DESC LIMIT 1",
            INFO_COLUMNS
        ),
        params![bucket, name],
        row_to_info,
    )
    .optional()
    .map_err(StoreError::from)
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ObjectStoreExt;
    use serde_json::json;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    fn store() -> SqliteStore {
        SqliteStore::open_memory(BucketConfig::default().with_chunk_size(4)).unwrap()
    }

    fn record(value: serde_json::Value) -> Record {
        Record::from_value(value).unwrap()
    }

    /// Yields its data, then fails instead of reporting EOF.
    struct FailAfter {
        data: Vec<u8>,
        pos: usize,
    }

    impl AsyncRead for FailAfter {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            if self.pos >= self.data.len() {
                return Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "source vanished",
                )));
            }
            let start = self.pos;
            let n = buf.remaining().min(self.data.len() - start);
            buf.put_slice(&self.data[start..start + n]);
            self.pos += n;
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_bulk_insert_and_find() {
        let store = store();
        let users = CollectionName::new("user").unwrap();

        let inserted = store
            .bulk_insert(&users, vec![record(json!({"_id": 1, "name": "kim"})), record(json!({"_id": 2, "name": "lee"}))])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.count("user").await.unwrap(), 2);

        let found = store.find_all("user").await.unwrap();
        assert_eq!(found[0].get("name"), Some(&json!("kim")));
        assert_eq!(found[1].id(), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_duplicate_id_rejects_batch() {
        let store = store();
        let users = CollectionName::new("user").unwrap();
        store.bulk_insert(&users, vec![record(json!({"_id": 1}))]).await.unwrap();

        let err = store
            .bulk_insert(&users, vec![record(json!({"_id": 2})), record(json!({"_id": 1}))])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { ref id, .. } if id == "1"));
        assert_eq!(store.count("user").await.unwrap(), 1);

        // Keys are per collection, records without _id never collide, and
        // a string id differs from a numeric one.
        let posts = CollectionName::new("post").unwrap();
        store
            .bulk_insert(&posts, vec![record(json!({"_id": 1})), record(json!({"_id": "1"}))])
            .await
            .unwrap();
        store
            .bulk_insert(&posts, vec![record(json!({"t": 1})), record(json!({"t": 2}))])
            .await
            .unwrap();
        assert_eq!(store.count("post").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_empty_insert_creates_nothing() {
        let store = store();
        let name = CollectionName::new("empty").unwrap();
        assert_eq!(store.bulk_insert(&name, Vec::new()).await.unwrap(), 0);
        assert!(store.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drop_collection_resets_counter() {
        let store = store();
        let name = CollectionName::new("post").unwrap();
        store.bulk_insert(&name, vec![record(json!({"t": 1}))]).await.unwrap();
        assert_eq!(store.next_seq("post").await.unwrap(), 1);
        assert_eq!(store.next_seq("post").await.unwrap(), 2);

        assert!(store.drop_collection("post").await.unwrap());
        assert!(!store.drop_collection("post").await.unwrap());
        assert_eq!(store.count("post").await.unwrap(), 0);
        assert_eq!(store.next_seq("post").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upload_download_multi_chunk() {
        let store = store();
        let id = store.upload_bytes("a.png", b"0123456789").await.unwrap();

        let info = store.find("a.png").await.unwrap().unwrap();
        assert_eq!(info.id, id);
        assert_eq!(info.length, 10);
        assert_eq!(info.chunk_count(), 3);

        let content = store.download("a.png").await.unwrap().unwrap();
        assert_eq!(content.as_ref(), b"0123456789");
    }

    #[tokio::test]
    async fn test_upload_empty_object() {
        let store = store();
        store.upload_bytes("empty.txt", b"").await.unwrap();
        let content = store.download("empty.txt").await.unwrap().unwrap();
        assert!(content.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_names_allowed() {
        let store = store();
        let first = store.upload_bytes("x.jpg", b"old").await.unwrap();
        let second = store.upload_bytes("x.jpg", b"new").await.unwrap();
        assert_ne!(first, second);

        assert_eq!(store.count_copies("x.jpg").await.unwrap(), 2);
        assert_eq!(store.list_names().await.unwrap().len(), 1);
        // Newest revision wins on read
        assert_eq!(store.download("x.jpg").await.unwrap().unwrap().as_ref(), b"new");

        // Oldest copy goes first on delete
        assert_eq!(store.delete("x.jpg").await.unwrap(), DeleteOutcome::Deleted(first));
        assert_eq!(store.find("x.jpg").await.unwrap().unwrap().id, second);
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let store = store();
        store.upload_bytes("keep.png", b"data").await.unwrap();

        assert_eq!(store.delete("ghost.png").await.unwrap(), DeleteOutcome::NotFound);
        assert_eq!(store.list_objects().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_chunks() {
        let store = store();
        store.upload_bytes("a.bin", b"0123456789").await.unwrap();
        store.delete("a.bin").await.unwrap();

        let chunks: i64 = store
            .conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM bucket_chunks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(chunks, 0);
        assert!(store.download("a.bin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_upload_is_invisible() {
        let store = store();
        let mut reader = FailAfter { data: b"0123456789".to_vec(), pos: 0 };

        let err = store.upload("broken.png", &mut reader).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(store.list_names().await.unwrap().is_empty());

        // Chunks written before the failure stay behind
        let chunks: i64 = store
            .conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM bucket_chunks", [], |row| row.get(0))
            .unwrap();
        assert!(chunks > 0);
    }

    #[tokio::test]
    async fn test_checksum_mismatch_detected() {
        let store = store();
        let id = store.upload_bytes("a.txt", b"abcd").await.unwrap();
        store
            .conn
            .lock()
            .unwrap()
            .execute(
                "UPDATE bucket_chunks SET data = ?1 WHERE files_id = ?2",
                params![b"abce".as_slice(), id.as_bytes().as_slice()],
            )
            .unwrap();

        let err = store.download("a.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::ChecksumMismatch { .. }));
    }

    #[tokio::test]
    async fn test_buckets_are_isolated() {
        let uploads = store();
        let avatars = uploads.with_bucket(BucketConfig::named("avatar")).unwrap();

        uploads.upload_bytes("a.png", b"1").await.unwrap();
        avatars.upload_bytes("b.png", b"2").await.unwrap();

        assert_eq!(uploads.list_names().await.unwrap().into_iter().collect::<Vec<_>>(), vec!["a.png"]);
        assert_eq!(avatars.list_names().await.unwrap().into_iter().collect::<Vec<_>>(), vec!["b.png"]);
        assert_eq!(avatars.delete("a.png").await.unwrap(), DeleteOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_drop_all_clears_buckets() {
        let store = store();
        let name = CollectionName::new("user").unwrap();
        store.bulk_insert(&name, vec![record(json!({"a": 1}))]).await.unwrap();
        store.upload_bytes("a.png", b"1").await.unwrap();

        store.drop_all().await.unwrap();
        assert!(store.list_collections().await.unwrap().is_empty());
        assert!(store.list_objects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.sqlite3");

        {
            let store = SqliteStore::open(&path, BucketConfig::default()).unwrap();
            store.upload_bytes("a.png", b"png").await.unwrap();
            let name = CollectionName::new("user").unwrap();
            store.bulk_insert(&name, vec![record(json!({"_id": 1}))]).await.unwrap();
        }

        let store = SqliteStore::open(&path, BucketConfig::default()).unwrap();
        assert!(store.list_names().await.unwrap().contains("a.png"));
        assert_eq!(store.count("user").await.unwrap(), 1);
    }

    #[test]
    fn test_open_rejects_bad_bucket() {
        let err = SqliteStore::open_memory(BucketConfig::default().with_chunk_size(0));
        assert!(matches!(err, Err(StoreError::InvalidConfig(_))));
    }
}
