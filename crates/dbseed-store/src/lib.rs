//! # dbseed store
//!
//! Storage for the seeding utility: a structured record store and a chunked
//! object bucket layered on the same database.
//!
//! ## Overview
//!
//! Two traits split the surface:
//!
//! - [`RecordStore`] - bulk insert, enumeration and dropping of record
//!   collections, plus named sequence counters
//! - [`ObjectStore`] - upload, download, delete and list of named binary
//!   objects stored as fixed-size chunks
//!
//! [`SqliteStore`] implements both on SQLite. [`MemoryStore`] implements both
//! in memory for tests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dbseed_store::{BucketConfig, ObjectStore, ObjectStoreExt, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("seed.sqlite3", BucketConfig::default()).unwrap();
//!
//!     let id = store.upload_bytes("logo.png", b"\x89PNG...").await.unwrap();
//!     let names = store.list_names().await.unwrap();
//!     assert!(names.contains("logo.png"));
//!     # let _ = id;
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Name is not unique**: uploading an existing name stores a second
//!   object; the two differ only by [`ObjectId`](dbseed_core::ObjectId)
//! - **Metadata last**: an object becomes visible only after its input is
//!   fully consumed; chunks written before a failure are not rolled back
//! - **No caching**: every listing re-queries the backend

pub mod chunk;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use chunk::{ChunkReader, ChunkSummary};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    BucketConfig, DeleteOutcome, ObjectInfo, ObjectStore, ObjectStoreExt, RecordStore,
    DEFAULT_BUCKET, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE,
};
