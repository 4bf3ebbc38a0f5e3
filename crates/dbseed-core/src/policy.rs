//! Reconciliation policy: which local files get uploaded, which stored
//! objects get deleted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The rule set applied by a sync run.
///
/// Selected once per run; never changes while the run is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReconciliationPolicy {
    /// Upload every local file, whether or not a copy is already stored.
    /// Stored objects are never deleted, so re-runs produce duplicates.
    #[serde(rename = "always")]
    AlwaysUpload,
    /// Delete stored objects with no local file; upload local files not yet
    /// stored. Objects present on both sides are left untouched.
    #[default]
    #[serde(rename = "update")]
    UpdateOnly,
    /// Leave the stored state exactly as it is.
    #[serde(rename = "none")]
    NoUpload,
}

impl ReconciliationPolicy {
    /// All policies, in declaration order.
    pub const ALL: [ReconciliationPolicy; 3] = [
        ReconciliationPolicy::AlwaysUpload,
        ReconciliationPolicy::UpdateOnly,
        ReconciliationPolicy::NoUpload,
    ];

    /// The configuration keyword for this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationPolicy::AlwaysUpload => "always",
            ReconciliationPolicy::UpdateOnly => "update",
            ReconciliationPolicy::NoUpload => "none",
        }
    }

    /// Whether a seeding run under this policy starts from an empty bucket.
    pub fn resets_bucket(&self) -> bool {
        matches!(self, ReconciliationPolicy::AlwaysUpload)
    }
}

impl fmt::Display for ReconciliationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReconciliationPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(ReconciliationPolicy::AlwaysUpload),
            "update" => Ok(ReconciliationPolicy::UpdateOnly),
            "none" => Ok(ReconciliationPolicy::NoUpload),
            _ => Err(CoreError::UnknownPolicy(s.to_string())),
        }
    }
}
