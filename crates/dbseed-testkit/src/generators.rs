//! Proptest generators for property-based testing.

use std::collections::BTreeSet;

use proptest::prelude::*;

/// Generate a plausible upload file name.
pub fn file_name() -> impl Strategy<Value = String> {
    ("[a-z0-9_-]{1,12}", prop_oneof![Just("png"), Just("jpg"), Just("pdf"), Just("txt")])
        .prop_map(|(stem, ext)| format!("{}.{}", stem, ext))
}

/// Generate a set of up to `max` file names.
pub fn name_set(max: usize) -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(file_name(), 0..=max)
}

/// Generate a (stored, local) pair that shares some names.
///
/// Built from three disjoint pools: names only stored, names only local,
/// and names on both sides.
pub fn overlapping_sets(max: usize) -> impl Strategy<Value = (BTreeSet<String>, BTreeSet<String>)> {
    (name_set(max), name_set(max), name_set(max)).prop_map(|(only_stored, only_local, shared)| {
        let stored: BTreeSet<String> = only_stored.union(&shared).cloned().collect();
        let local: BTreeSet<String> = only_local.union(&shared).cloned().collect();
        (stored, local)
    })
}

/// Generate file content of at most `max_len` bytes.
pub fn content(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn file_names_have_extension(name in file_name()) {
            prop_assert!(name.contains('.'));
            prop_assert!(!name.starts_with('.'));
        }

        #[test]
        fn name_set_respects_max(names in name_set(5)) {
            prop_assert!(names.len() <= 5);
        }
    }
}
