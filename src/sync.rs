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

use std::collections::BTreeSet;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::error::*;
use super::reconcile::{reconcile_membership, reconcile_set, Membership};

/// What the task wants for the listed members.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Add listed members missing on the array.
    Present,
    /// Remove listed members found on the array.
    Absent,
}

impl DesiredState {
    fn verb(self) -> &'static str {
        match self {
            DesiredState::Present => "add",
            DesiredState::Absent => "remove",
        }
    }

    fn detail_key(self) -> &'static str {
        match self {
            DesiredState::Present => "added",
            DesiredState::Absent => "removed",
        }
    }
}

/// Outcome of one reconcile pass.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChangeResult {
    pub changed: bool,
    pub detail: Value,
}

impl ChangeResult {
    pub fn unchanged() -> ChangeResult {
        ChangeResult {
            changed: false,
            detail: Value::Null,
        }
    }
}

/// Resource whose membership is grouped by key, e.g. host groups per
/// port.
pub trait MembershipResource {
    type Key: Ord + Clone + Display;
    type Member: Ord + Clone + Display;

    /// Name used in log lines and errors.
    fn kind(&self) -> &'static str;

    /// Bring user supplied membership into the form `observe()` reports,
    /// so equal objects compare equal. Identity by default.
    fn normalize(
        &self,
        desired: &Membership<Self::Key, Self::Member>,
    ) -> Result<Membership<Self::Key, Self::Member>> {
        Ok(desired.clone())
    }

    /// Query the array for the current membership. Never cached across
    /// passes.
    fn observe(&mut self) -> Result<Membership<Self::Key, Self::Member>>;

    fn add(&mut self, key: &Self::Key, member: &Self::Member) -> Result<()>;

    fn remove(&mut self, key: &Self::Key, member: &Self::Member) -> Result<()>;
}

/// Resource holding a flat member set, e.g. LUN paths of one host group.
pub trait SetResource {
    type Member: Ord + Clone + Display;

    fn kind(&self) -> &'static str;

    /// Object the members belong to, for log lines and errors.
    fn scope(&self) -> String;

    fn observe(&mut self) -> Result<BTreeSet<Self::Member>>;

    fn add(&mut self, member: &Self::Member) -> Result<()>;

    fn remove(&mut self, member: &Self::Member) -> Result<()>;
}

/// Converge a grouped resource toward `desired`.
///
/// The first failing mutation aborts the pass; earlier mutations are not
/// rolled back and the error tells how many were applied.
pub fn converge_membership<R: MembershipResource>(
    resource: &mut R,
    desired: &Membership<R::Key, R::Member>,
    state: DesiredState,
) -> Result<ChangeResult> {
    let desired = resource.normalize(desired)?;
    let observed = resource.observe()?;
    let delta = reconcile_membership(&desired, &observed);
    let plan = match state {
        DesiredState::Present => delta.to_add,
        DesiredState::Absent => delta.to_remove,
    };
    let steps: Vec<(&R::Key, &R::Member)> = plan
        .iter()
        .flat_map(|(k, members)| members.iter().map(move |m| (k, m)))
        .collect();
    let kind = resource.kind();
    apply(kind, state, steps, |k, m| match state {
        DesiredState::Present => resource.add(k, m),
        DesiredState::Absent => resource.remove(k, m),
    })
}

/// Converge a flat resource toward `desired`.
pub fn converge_set<R: SetResource>(
    resource: &mut R,
    desired: &BTreeSet<R::Member>,
    state: DesiredState,
) -> Result<ChangeResult> {
    let observed = resource.observe()?;
    let delta = reconcile_set(desired, &observed);
    let plan = match state {
        DesiredState::Present => delta.to_add,
        DesiredState::Absent => delta.to_remove,
    };
    let scope = resource.scope();
    let steps: Vec<(&String, &R::Member)> = plan.iter().map(|m| (&scope, m)).collect();
    let kind = resource.kind();
    apply(kind, state, steps, |_, m| match state {
        DesiredState::Present => resource.add(m),
        DesiredState::Absent => resource.remove(m),
    })
}

fn apply<K, M, F>(
    kind: &str,
    state: DesiredState,
    steps: Vec<(&K, &M)>,
    mut op: F,
) -> Result<ChangeResult>
where
    K: Display,
    M: Display,
    F: FnMut(&K, &M) -> Result<()>,
{
    if steps.is_empty() {
        debug!(kind, state = ?state, "already converged");
        return Ok(ChangeResult::unchanged());
    }
    let mut applied: Vec<Value> = Vec::with_capacity(steps.len());
    for (key, member) in steps {
        op(key, member).map_err(|e| {
            e.context(&format!(
                "Failed to {} {} '{}' of '{}' after {} change(s) applied",
                state.verb(),
                kind,
                member,
                key,
                applied.len()
            ))
        })?;
        info!(kind, key = %key, member = %member, "{}", state.detail_key());
        applied.push(json!({"key": key.to_string(), "member": member.to_string()}));
    }
    Ok(ChangeResult {
        changed: true,
        detail: json!({ state.detail_key(): applied }),
    })
}
