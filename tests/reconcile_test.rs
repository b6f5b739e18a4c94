use std::collections::{BTreeMap, BTreeSet};

use arraymgmt::{reconcile_membership, reconcile_set, Membership};
use proptest::prelude::*;

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn membership(entries: &[(&str, &[&str])]) -> Membership<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), set(v)))
        .collect()
}

#[test]
fn flat_reconcile() {
    let delta = reconcile_set(&set(&["hg1", "hg2"]), &set(&["hg2", "hg3"]));
    assert_eq!(set(&["hg1"]), delta.to_add);
    assert_eq!(set(&["hg2"]), delta.to_remove);
    assert!(!delta.is_empty());
}

#[test]
fn flat_reconcile_against_nothing() {
    let delta = reconcile_set(&set(&["hg1", "hg2"]), &BTreeSet::new());
    assert_eq!(set(&["hg1", "hg2"]), delta.to_add);
    assert!(delta.to_remove.is_empty());
}

#[test]
fn empty_desired_changes_nothing() {
    let delta = reconcile_set(&BTreeSet::new(), &set(&["hg1"]));
    assert!(delta.is_empty());
}

#[test]
fn two_level_port_scenario() {
    let desired = membership(&[("CL1-A", &["hg1", "hg2"])]);
    let observed = membership(&[("CL1-A", &["hg2", "hg3"]), ("CL2-A", &["hg4"])]);

    let delta = reconcile_membership(&desired, &observed);

    assert_eq!(membership(&[("CL1-A", &["hg1"])]), delta.to_add);
    assert_eq!(membership(&[("CL1-A", &["hg2"])]), delta.to_remove);
}

#[test]
fn two_level_new_key_adds_all_members() {
    let desired = membership(&[("CL1-A", &["hg1"]), ("CL3-B", &["hg5", "hg6"])]);
    let observed = membership(&[("CL1-A", &["hg1"])]);

    let delta = reconcile_membership(&desired, &observed);

    assert_eq!(membership(&[("CL3-B", &["hg5", "hg6"])]), delta.to_add);
    assert_eq!(membership(&[("CL1-A", &["hg1"])]), delta.to_remove);
}

#[test]
fn two_level_omits_empty_entries() {
    let desired = membership(&[("CL1-A", &[]), ("CL2-A", &["hg1"])]);
    let observed = membership(&[("CL2-A", &["hg1"])]);

    let delta = reconcile_membership(&desired, &observed);

    assert!(delta.to_add.is_empty());
    assert_eq!(membership(&[("CL2-A", &["hg1"])]), delta.to_remove);
}

#[test]
fn two_level_works_with_numeric_members() {
    let mut desired: Membership<String, u32> = BTreeMap::new();
    desired.insert("CL1-A,3".to_string(), [100, 101].into_iter().collect());
    let mut observed: Membership<String, u32> = BTreeMap::new();
    observed.insert("CL1-A,3".to_string(), [101, 102].into_iter().collect());

    let delta = reconcile_membership(&desired, &observed);

    let added: BTreeSet<u32> = [100].into_iter().collect();
    let removed: BTreeSet<u32> = [101].into_iter().collect();
    assert_eq!(Some(&added), delta.to_add.get("CL1-A,3"));
    assert_eq!(Some(&removed), delta.to_remove.get("CL1-A,3"));
}

fn arb_set() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("hg[0-9]", 0..6)
}

fn arb_membership() -> impl Strategy<Value = Membership<String, String>> {
    prop::collection::btree_map("CL[1-4]-[A-B]", arb_set(), 0..5)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_flat_matches_set_algebra(d in arb_set(), o in arb_set()) {
        let delta = reconcile_set(&d, &o);
        let expect_add: BTreeSet<String> = d.difference(&o).cloned().collect();
        let expect_remove: BTreeSet<String> = o.intersection(&d).cloned().collect();
        prop_assert_eq!(expect_add, delta.to_add);
        prop_assert_eq!(expect_remove, delta.to_remove);
    }

    #[test]
    fn prop_reconcile_with_self_adds_nothing(d in arb_set()) {
        let delta = reconcile_set(&d, &d);
        prop_assert!(delta.to_add.is_empty());
        prop_assert_eq!(&d, &delta.to_remove);
    }

    #[test]
    fn prop_applied_additions_converge(d in arb_membership(), o in arb_membership()) {
        let delta = reconcile_membership(&d, &o);
        let mut after = o.clone();
        for (k, members) in delta.to_add {
            after.entry(k).or_default().extend(members);
        }
        prop_assert!(reconcile_membership(&d, &after).to_add.is_empty());
    }

    #[test]
    fn prop_two_level_equals_per_key_flat(d in arb_membership(), o in arb_membership()) {
        let delta = reconcile_membership(&d, &o);

        let mut expect_add = Membership::new();
        let mut expect_remove = Membership::new();
        for (k, wanted) in &d {
            match o.get(k) {
                Some(current) => {
                    let flat = reconcile_set(wanted, current);
                    if !flat.to_add.is_empty() {
                        expect_add.insert(k.clone(), flat.to_add);
                    }
                    if !flat.to_remove.is_empty() {
                        expect_remove.insert(k.clone(), flat.to_remove);
                    }
                }
                None if !wanted.is_empty() => {
                    expect_add.insert(k.clone(), wanted.clone());
                }
                None => {}
            }
        }
        prop_assert_eq!(expect_add, delta.to_add);
        prop_assert_eq!(expect_remove, delta.to_remove);
    }

    #[test]
    fn prop_no_key_both_added_wholesale_and_removed(d in arb_membership(), o in arb_membership()) {
        let delta = reconcile_membership(&d, &o);
        for k in delta.to_remove.keys() {
            prop_assert!(d.contains_key(k) && o.contains_key(k));
        }
        for k in delta.to_add.keys() {
            prop_assert!(d.contains_key(k));
        }
    }
}
