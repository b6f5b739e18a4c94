// Copyright (C) 2017-2018 Red Hat, Inc.
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Set-difference reconciliation of desired against observed membership.
//!
//! Removals are computed as `observed ∩ desired`: a desired member is a
//! removal candidate when it exists on the array. That is the plan an
//! `absent` task applies, while `present` tasks apply the additions
//! (`desired - observed`). Members that exist on the array but are not
//! listed in the desired state are never touched.

use std::collections::{BTreeMap, BTreeSet};

/// Grouping key (e.g. port id) to member set (e.g. host-group names).
pub type Membership<K, M> = BTreeMap<K, BTreeSet<M>>;

/// Changes for a flat member set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDelta<M> {
    pub to_add: BTreeSet<M>,
    pub to_remove: BTreeSet<M>,
}

impl<M> SetDelta<M> {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Changes for a two-level membership. Keys with nothing to change are
/// left out of both maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipDelta<K, M> {
    pub to_add: Membership<K, M>,
    pub to_remove: Membership<K, M>,
}

impl<K: Ord, M> MembershipDelta<K, M> {
    pub fn new() -> MembershipDelta<K, M> {
        MembershipDelta {
            to_add: BTreeMap::new(),
            to_remove: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

impl<K: Ord, M> Default for MembershipDelta<K, M> {
    fn default() -> Self {
        MembershipDelta::new()
    }
}

/// `to_add = desired - observed`, `to_remove = observed ∩ desired`.
pub fn reconcile_set<M: Ord + Clone>(
    desired: &BTreeSet<M>,
    observed: &BTreeSet<M>,
) -> SetDelta<M> {
    SetDelta {
        to_add: desired.difference(observed).cloned().collect(),
        to_remove: observed.intersection(desired).cloned().collect(),
    }
}

/// Two-level reconciliation.
///
/// Keys only in `desired` get every desired member added. Keys in both
/// maps are reconciled member by member with [`reconcile_set()`][1].
/// Keys only in `observed` are ignored: whole-key removal requires the
/// key to be a removal candidate (in both maps) and absent from
/// `desired` at the same time, so a key is never added and removed in
/// one pass.
///
/// [1]: fn.reconcile_set.html
pub fn reconcile_membership<K, M>(
    desired: &Membership<K, M>,
    observed: &Membership<K, M>,
) -> MembershipDelta<K, M>
where
    K: Ord + Clone,
    M: Ord + Clone,
{
    let desired_keys: BTreeSet<&K> = desired.keys().collect();
    let observed_keys: BTreeSet<&K> = observed.keys().collect();
    let keys = reconcile_set(&desired_keys, &observed_keys);

    let mut delta = MembershipDelta::new();
    for key in keys.to_add {
        if let Some(members) = desired.get(key) {
            if !members.is_empty() {
                delta.to_add.insert(key.clone(), members.clone());
            }
        }
    }
    // keys.to_remove holds the keys present on both sides.
    for key in keys.to_remove {
        let (wanted, current) = match (desired.get(key), observed.get(key)) {
            (Some(w), Some(c)) => (w, c),
            _ => continue,
        };
        let members = reconcile_set(wanted, current);
        if !members.to_add.is_empty() {
            delta.to_add.insert(key.clone(), members.to_add);
        }
        if !members.to_remove.is_empty() {
            delta.to_remove.insert(key.clone(), members.to_remove);
        }
    }
    delta
}
