//! The sync driver.
//!
//! A run lists both sides, computes a plan, executes every delete and
//! then every upload. Listing failures abort the run before anything is
//! mutated. Failures of single items are recorded and the run continues.

use dbseed_core::{reconcile, ReconciliationPolicy};
use dbseed_store::{DeleteOutcome, ObjectStore};

use crate::error::{Result, SyncError};
use crate::local::LocalDirectory;
use crate::report::{ItemStatus, SyncAction, SyncReport};

/// Where a run currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Listing,
    Reconciling,
    Deleting,
    Uploading,
    Done,
    Failed { reason: String },
}

impl SyncPhase {
    /// True once a run has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncPhase::Done | SyncPhase::Failed { .. })
    }
}

/// Mirrors a local directory into an object store bucket.
pub struct Synchronizer<S: ObjectStore> {
    store: S,
    source: LocalDirectory,
    policy: ReconciliationPolicy,
    phase: SyncPhase,
}

impl<S: ObjectStore> Synchronizer<S> {
    /// Create a synchronizer. Nothing is read until [`run`](Self::run).
    pub fn new(store: S, source: LocalDirectory, policy: ReconciliationPolicy) -> Self {
        Self {
            store,
            source,
            policy,
            phase: SyncPhase::Idle,
        }
    }

    pub fn phase(&self) -> &SyncPhase {
        &self.phase
    }

    pub fn policy(&self) -> ReconciliationPolicy {
        self.policy
    }

    pub fn source(&self) -> &LocalDirectory {
        &self.source
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the synchronizer and return the store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Execute one run.
    ///
    /// Returns a fatal [`SyncError`] only if a listing fails. Item failures
    /// are in the report. A synchronizer may be run again; each run lists
    /// both sides afresh.
    pub async fn run(&mut self) -> Result<SyncReport> {
        self.phase = SyncPhase::Listing;
        let (stored, local) = match self.list_both().await {
            Ok(listings) => listings,
            Err(e) => {
                tracing::warn!(error = %e, "sync aborted while listing");
                self.phase = SyncPhase::Failed {
                    reason: e.to_string(),
                };
                return Err(e);
            }
        };

        self.phase = SyncPhase::Reconciling;
        let plan = reconcile(&stored, &local, self.policy);
        tracing::info!(
            policy = %self.policy,
            bucket = %self.store.bucket().name,
            stored = stored.len(),
            local = local.len(),
            to_delete = plan.to_delete.len(),
            to_upload = plan.to_upload.len(),
            "computed sync plan"
        );

        let mut report = SyncReport::new(self.policy, plan.clone());

        self.phase = SyncPhase::Deleting;
        for name in &plan.to_delete {
            let status = match self.delete_one(name).await {
                Ok(DeleteOutcome::Deleted(id)) => {
                    tracing::info!(name, id = %id, "deleted object");
                    ItemStatus::Deleted(id)
                }
                Ok(DeleteOutcome::NotFound) => {
                    tracing::debug!(name, "object already absent");
                    ItemStatus::Missing
                }
                Err(e) => {
                    tracing::warn!(error = %e, "delete failed");
                    ItemStatus::Failed(e.to_string())
                }
            };
            report.record(name, SyncAction::Delete, status);
        }

        self.phase = SyncPhase::Uploading;
        for name in &plan.to_upload {
            let status = match self.upload_one(name).await {
                Ok(id) => {
                    tracing::info!(name, id = %id, "uploaded object");
                    ItemStatus::Uploaded(id)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "upload failed");
                    ItemStatus::Failed(e.to_string())
                }
            };
            report.record(name, SyncAction::Upload, status);
        }

        let counts = report.counts();
        tracing::info!(
            deleted = counts.deleted,
            missing = counts.missing,
            uploaded = counts.uploaded,
            failed = counts.failed,
            "sync finished"
        );

        self.phase = SyncPhase::Done;
        Ok(report)
    }

    async fn list_both(
        &self,
    ) -> Result<(std::collections::BTreeSet<String>, std::collections::BTreeSet<String>)> {
        let stored = self
            .store
            .list_names()
            .await
            .map_err(SyncError::StoreUnavailable)?;
        let local = self.source.list_names().await?;
        Ok((stored, local))
    }

    async fn delete_one(&self, name: &str) -> Result<DeleteOutcome> {
        self.store
            .delete(name)
            .await
            .map_err(|e| SyncError::DeleteFailed {
                name: name.to_string(),
                cause: e.to_string(),
            })
    }

    async fn upload_one(&self, name: &str) -> Result<dbseed_core::ObjectId> {
        let failed = |cause: String| SyncError::UploadFailed {
            name: name.to_string(),
            cause,
        };

        // The file handle is dropped at the end of this call, on every path.
        let mut file = self
            .source
            .open(name)
            .await
            .map_err(|e| failed(e.to_string()))?;
        self.store
            .upload(name, &mut file)
            .await
            .map_err(|e| failed(e.to_string()))
    }
}
