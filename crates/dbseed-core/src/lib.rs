//! # dbseed core
//!
//! Pure primitives for the seeding utility: reconciliation policies, sync
//! plans, typed seed data, and object identifiers.
//!
//! This crate contains no I/O, no storage, no networking. Everything here is
//! computation over in-memory values.
//!
//! ## Key Types
//!
//! - [`ReconciliationPolicy`] - Rule set for which files get uploaded/deleted
//! - [`Plan`] - The delete/upload actions computed for one sync run
//! - [`SeedData`] - Typed mapping from collection name to records
//! - [`ObjectId`] - Opaque 12-byte identifier of a stored object
//!
//! ## Reconciliation
//!
//! [`reconcile`] compares stored object names against local file names by
//! name only. No checksums, no modification times.

pub mod error;
pub mod policy;
pub mod reconcile;
pub mod seed;
pub mod types;
pub mod validation;

pub use error::CoreError;
pub use policy::ReconciliationPolicy;
pub use reconcile::{reconcile, Plan};
pub use seed::{CollectionName, Record, SeedData, ID_FIELD};
pub use types::ObjectId;
pub use validation::{validate_collection_name, validate_field_name, MAX_COLLECTION_NAME_LEN};
