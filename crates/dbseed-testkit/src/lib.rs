//! # dbseed Testkit
//!
//! Testing utilities for dbseed.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a temporary target directory next to an in-memory store
//! - **Generators**: Proptest strategies for file names and name sets
//! - **Faults**: a store wrapper that fails chosen operations on demand
//!
//! ## Test Fixtures
//!
//! ```rust
//! use dbseed_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! fixture.write_file("a.png", b"png bytes");
//! assert!(fixture.upload_dir().join("a.png").exists());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use dbseed_testkit::generators::name_set;
//!
//! proptest! {
//!     #[test]
//!     fn plan_is_disjoint(stored in name_set(8), local in name_set(8)) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Fault Injection
//!
//! ```rust
//! use dbseed_store::MemoryStore;
//! use dbseed_testkit::faults::FaultyStore;
//!
//! let store = FaultyStore::new(MemoryStore::new());
//! store.fail_upload_once("b.png");
//! ```

pub mod faults;
pub mod fixtures;
pub mod generators;

pub use faults::FaultyStore;
pub use fixtures::TestFixture;
pub use generators::{content, file_name, name_set, overlapping_sets};
