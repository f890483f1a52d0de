//! Property-based tests for the set-difference helper shared by every differ.
//!
//! These tests verify that:
//! - Every key of either side is classified exactly once, or not at all when equal
//! - Deltas come out in ascending key order
//! - Diffing a map against itself yields nothing

use proptest::prelude::*;
use repoconf_domain::{Delta, set_diff};
use std::collections::BTreeMap;

fn arb_map() -> impl Strategy<Value = BTreeMap<String, u8>> {
    prop::collection::btree_map("[a-e]{1,2}", 0u8..3, 0..8)
}

proptest! {
    #[test]
    fn classifies_every_key(wanted in arb_map(), current in arb_map()) {
        let deltas = set_diff(&wanted, &current, |w, c| w == c);

        for delta in &deltas {
            match delta {
                Delta::Added { key, wanted: w } => {
                    prop_assert!(!current.contains_key(*key));
                    prop_assert_eq!(wanted.get(*key), Some(*w));
                }
                Delta::Removed { key, current: c } => {
                    prop_assert!(!wanted.contains_key(*key));
                    prop_assert_eq!(current.get(*key), Some(*c));
                }
                Delta::Changed { key, current: c, wanted: w } => {
                    prop_assert_ne!(w, c);
                    prop_assert_eq!(wanted.get(*key), Some(*w));
                    prop_assert_eq!(current.get(*key), Some(*c));
                }
            }
        }

        let unchanged = wanted
            .iter()
            .filter(|(k, v)| current.get(*k) == Some(*v))
            .count();
        let union = wanted.keys().chain(current.keys()).collect::<std::collections::BTreeSet<_>>();
        prop_assert_eq!(deltas.len() + unchanged, union.len());
    }

    #[test]
    fn deltas_are_sorted_by_key(wanted in arb_map(), current in arb_map()) {
        let keys: Vec<&String> = set_diff(&wanted, &current, |w, c| w == c)
            .iter()
            .map(|d| d.key())
            .collect();

        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(keys, sorted);
    }

    #[test]
    fn a_map_has_no_diff_with_itself(map in arb_map()) {
        prop_assert!(set_diff(&map, &map, |w, c| w == c).is_empty());
    }
}
