//! Reconciliation: compute the delete/upload plan for one sync run.
//!
//! Pure function over two name sets and a policy. Comparison is by name
//! only; content under an unchanged name is never refreshed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::policy::ReconciliationPolicy;

/// The actions computed for one sync run.
///
/// Both sequences are sorted and free of duplicates. A plan is derived fresh
/// each run and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Stored object names to delete.
    pub to_delete: Vec<String>,
    /// Local file names to upload.
    pub to_upload: Vec<String>,
}

impl Plan {
    /// True when the plan performs no action.
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_upload.is_empty()
    }

    /// Total number of actions.
    pub fn len(&self) -> usize {
        self.to_delete.len() + self.to_upload.len()
    }
}

/// Compute the plan for `policy` given the stored and local name sets.
///
/// - `AlwaysUpload`: upload every local name, delete nothing.
/// - `UpdateOnly`: delete `stored - local`, upload `local - stored`.
/// - `NoUpload`: nothing.
pub fn reconcile(
    stored: &BTreeSet<String>,
    local: &BTreeSet<String>,
    policy: ReconciliationPolicy,
) -> Plan {
    match policy {
        ReconciliationPolicy::AlwaysUpload => Plan {
            to_delete: Vec::new(),
            to_upload: local.iter().cloned().collect(),
        },
        ReconciliationPolicy::UpdateOnly => Plan {
            to_delete: stored.difference(local).cloned().collect(),
            to_upload: local.difference(stored).cloned().collect(),
        },
        ReconciliationPolicy::NoUpload => Plan::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_update_only_scenario() {
        let stored = set(&["a.png", "b.png"]);
        let local = set(&["b.png", "c.png"]);

        let plan = reconcile(&stored, &local, ReconciliationPolicy::UpdateOnly);
        assert_eq!(plan.to_delete, vec!["a.png"]);
        assert_eq!(plan.to_upload, vec!["c.png"]);
    }

    #[test]
    fn test_always_upload_ignores_stored() {
        let stored = set(&["x.jpg"]);
        let local = set(&["x.jpg", "y.jpg"]);

        let plan = reconcile(&stored, &local, ReconciliationPolicy::AlwaysUpload);
        assert!(plan.to_delete.is_empty());
        assert_eq!(plan.to_upload, vec!["x.jpg", "y.jpg"]);
    }

    #[test]
    fn test_no_upload_is_empty() {
        let plan = reconcile(&set(&["a"]), &set(&["b"]), ReconciliationPolicy::NoUpload);
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
    }

    #[test]
    fn test_output_sorted() {
        let local = set(&["z", "m", "a"]);
        let plan = reconcile(&BTreeSet::new(), &local, ReconciliationPolicy::UpdateOnly);
        assert_eq!(plan.to_upload, vec!["a", "m", "z"]);
    }

    fn name_set() -> impl Strategy<Value = BTreeSet<String>> {
        prop::collection::btree_set("[a-z]{1,6}\\.(png|jpg)", 0..16)
    }

    proptest! {
        #[test]
        fn prop_update_only_disjoint_inputs(stored in name_set(), local in name_set()) {
            prop_assume!(stored.is_disjoint(&local));
            let plan = reconcile(&stored, &local, ReconciliationPolicy::UpdateOnly);
            prop_assert_eq!(plan.to_delete, stored.into_iter().collect::<Vec<_>>());
            prop_assert_eq!(plan.to_upload, local.into_iter().collect::<Vec<_>>());
        }

        #[test]
        fn prop_update_only_equal_inputs(names in name_set()) {
            let plan = reconcile(&names, &names, ReconciliationPolicy::UpdateOnly);
            prop_assert!(plan.is_empty());
        }

        #[test]
        fn prop_update_only_outputs_disjoint(stored in name_set(), local in name_set()) {
            let plan = reconcile(&stored, &local, ReconciliationPolicy::UpdateOnly);
            let deletes: BTreeSet<_> = plan.to_delete.iter().collect();
            prop_assert!(plan.to_upload.iter().all(|n| !deletes.contains(n)));
        }

        #[test]
        fn prop_no_upload_always_empty(stored in name_set(), local in name_set()) {
            prop_assert!(reconcile(&stored, &local, ReconciliationPolicy::NoUpload).is_empty());
        }

        #[test]
        fn prop_always_upload_uploads_local(stored in name_set(), local in name_set()) {
            let plan = reconcile(&stored, &local, ReconciliationPolicy::AlwaysUpload);
            prop_assert!(plan.to_delete.is_empty());
            prop_assert_eq!(plan.to_upload, local.into_iter().collect::<Vec<_>>());
        }
    }
}
