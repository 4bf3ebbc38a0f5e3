//! Per-run outcome reporting.

use serde::Serialize;

use dbseed_core::{ObjectId, Plan, ReconciliationPolicy};

/// Which half of the plan an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Delete,
    Upload,
}

/// What happened to one planned item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum ItemStatus {
    /// The oldest stored copy with the name was removed.
    Deleted(ObjectId),
    /// Nothing with the name was stored at delete time. Not an error.
    Missing,
    /// A new object was stored.
    Uploaded(ObjectId),
    /// The item failed; the rest of the run continued.
    Failed(String),
}

impl ItemStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, ItemStatus::Failed(_))
    }
}

/// Outcome of one planned item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub name: String,
    pub action: SyncAction,
    pub status: ItemStatus,
}

/// Tallies over a report's outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    pub deleted: usize,
    pub missing: usize,
    pub uploaded: usize,
    pub failed: usize,
}

/// Report of a completed sync run.
///
/// Outcomes are in execution order: every delete, then every upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Policy the run used.
    pub policy: ReconciliationPolicy,
    /// Plan computed from the listings.
    pub plan: Plan,
    /// One entry per planned item.
    pub outcomes: Vec<ItemOutcome>,
}

impl SyncReport {
    pub(crate) fn new(policy: ReconciliationPolicy, plan: Plan) -> Self {
        let outcomes = Vec::with_capacity(plan.len());
        Self {
            policy,
            plan,
            outcomes,
        }
    }

    pub(crate) fn record(&mut self, name: &str, action: SyncAction, status: ItemStatus) {
        self.outcomes.push(ItemOutcome {
            name: name.to_string(),
            action,
            status,
        });
    }

    /// Count outcomes by status.
    pub fn counts(&self) -> SyncCounts {
        let mut counts = SyncCounts::default();
        for outcome in &self.outcomes {
            match outcome.status {
                ItemStatus::Deleted(_) => counts.deleted += 1,
                ItemStatus::Missing => counts.missing += 1,
                ItemStatus::Uploaded(_) => counts.uploaded += 1,
                ItemStatus::Failed(_) => counts.failed += 1,
            }
        }
        counts
    }

    /// Outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_failed())
    }

    /// Look up the outcome for a name and action.
    pub fn outcome(&self, name: &str, action: SyncAction) -> Option<&ItemOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.name == name && o.action == action)
    }

    /// True when no item failed.
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> SyncReport {
        let plan = Plan {
            to_delete: vec!["a".into(), "gone".into()],
            to_upload: vec!["c".into(), "d".into()],
        };
        let mut report = SyncReport::new(ReconciliationPolicy::UpdateOnly, plan);
        let id = ObjectId::from_bytes([7; 12]);
        report.record("a", SyncAction::Delete, ItemStatus::Deleted(id));
        report.record("gone", SyncAction::Delete, ItemStatus::Missing);
        report.record("c", SyncAction::Upload, ItemStatus::Uploaded(id));
        report.record("d", SyncAction::Upload, ItemStatus::Failed("boom".into()));
        report
    }

    #[test]
    fn test_counts() {
        let counts = report().counts();
        assert_eq!(
            counts,
            SyncCounts {
                deleted: 1,
                missing: 1,
                uploaded: 1,
                failed: 1
            }
        );
    }

    #[test]
    fn test_failures_and_lookup() {
        let report = report();
        assert!(!report.is_clean());

        let failed: Vec<_> = report.failures().map(|o| o.name.as_str()).collect();
        assert_eq!(failed, vec!["d"]);

        assert!(report.outcome("c", SyncAction::Upload).is_some());
        assert!(report.outcome("c", SyncAction::Delete).is_none());
    }

    #[test]
    fn test_report_serializes() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["policy"], "update");
        assert_eq!(json["outcomes"][1]["status"]["status"], "missing");
        assert_eq!(json["outcomes"][3]["status"]["detail"], "boom");
    }
}
