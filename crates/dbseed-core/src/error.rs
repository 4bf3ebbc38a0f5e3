//! Error types for dbseed core.

use thiserror::Error;

/// Errors raised while parsing or validating core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown reconciliation policy: {0:?} (expected always, update or none)")]
    UnknownPolicy(String),

    #[error("invalid collection name {name:?}: {reason}")]
    InvalidCollectionName { name: String, reason: String },

    #[error("invalid record #{index} in collection {collection}: {reason}")]
    InvalidRecord {
        collection: String,
        index: usize,
        reason: String,
    },

    #[error("malformed seed data: {0}")]
    MalformedSeedData(String),

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
