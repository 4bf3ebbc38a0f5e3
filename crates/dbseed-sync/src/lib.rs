//! # dbseed Sync
//!
//! Mirrors a local directory of files into an object store bucket.
//!
//! ## Overview
//!
//! A run has four steps:
//!
//! 1. List stored object names and local file names.
//! 2. Compute a [`Plan`](dbseed_core::Plan) with
//!    [`reconcile`](dbseed_core::reconcile) for the configured policy.
//! 3. Execute every delete, then every upload.
//! 4. Return a [`SyncReport`] with one outcome per planned item.
//!
//! ## Key Properties
//!
//! - **Fail early**: a listing failure aborts the run before any mutation
//! - **Best effort**: a failed delete or upload is recorded and the run continues
//! - **Re-runnable**: each run lists both sides afresh, so a second
//!   `UpdateOnly` run retries exactly what failed
//! - **Read-only source**: the local directory is never modified
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dbseed_core::ReconciliationPolicy;
//! use dbseed_store::{BucketConfig, SqliteStore};
//! use dbseed_sync::{LocalDirectory, Synchronizer};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::open("seed.sqlite3", BucketConfig::default())?;
//!     let source = LocalDirectory::new("data/uploadFiles");
//!
//!     let mut sync = Synchronizer::new(store, source, ReconciliationPolicy::UpdateOnly);
//!     let report = sync.run().await?;
//!     println!("{} uploaded", report.counts().uploaded);
//!     Ok(())
//! }
//! ```
//!
//! ## Phases
//!
//! ```text
//! Idle -> Listing -> Reconciling -> Deleting -> Uploading -> Done
//!            |
//!            +-> Failed
//! ```

pub mod convergence;
pub mod driver;
pub mod error;
pub mod local;
pub mod report;

pub use convergence::{find_duplicates, verify_convergence, ConvergenceResult};
pub use driver::{SyncPhase, Synchronizer};
pub use error::{Result, SyncError};
pub use local::{LocalDirectory, LocalFile};
pub use report::{ItemOutcome, ItemStatus, SyncAction, SyncCounts, SyncReport};
