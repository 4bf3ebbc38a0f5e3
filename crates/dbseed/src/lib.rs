//! # dbseed
//!
//! Seed a database from a target directory.
//!
//! ## Overview
//!
//! A seeding run takes a target directory laid out as:
//!
//! ```text
//! <target_dir>/
//!   data.json       collection name -> array of records
//!   uploadFiles/    files mirrored into the "upload" bucket
//! ```
//!
//! and does four things against one store:
//!
//! 1. **Reset**: drop the record collections. Under `AlwaysUpload` the
//!    bucket is dropped as well.
//! 2. **Load** `data.json` into typed [`SeedData`](dbseed_core::SeedData).
//! 3. **Insert** each collection, assigning a sequential `_id` to records
//!    that lack one.
//! 4. **Synchronize** the upload directory into the bucket according to the
//!    [`ReconciliationPolicy`].
//!
//! ## Policies
//!
//! - `always`: upload every local file. The bucket was emptied by the reset.
//! - `update`: delete stored names with no local file, upload local names
//!   with no stored object. Existing names are left alone.
//! - `none`: leave the bucket untouched.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dbseed::{Seeder, SeederConfig, ReconciliationPolicy};
//! use dbseed::store::{BucketConfig, SqliteStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::open("acme.sqlite3", BucketConfig::default())?;
//!     let config = SeederConfig::for_target("acme")
//!         .with_policy(ReconciliationPolicy::UpdateOnly);
//!
//!     let report = Seeder::new(store, config).run().await?;
//!     println!("inserted {} records", report.total_inserted);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `dbseed::core` - Policies, reconciliation, seed data types
//! - `dbseed::store` - Record store and chunked bucket, SQLite and memory
//! - `dbseed::sync` - Directory-to-bucket synchronizer

pub mod error;
pub mod seeder;

// Re-export component crates
pub use dbseed_core as core;
pub use dbseed_store as store;
pub use dbseed_sync as sync;

// Re-export main types for convenience
pub use error::{Result, SeedError};
pub use seeder::{SeedReport, Seeder, SeederConfig, DATA_FILE, UPLOAD_DIR};

pub use dbseed_core::{Plan, ReconciliationPolicy};
pub use dbseed_sync::{SyncPhase, SyncReport, Synchronizer};
