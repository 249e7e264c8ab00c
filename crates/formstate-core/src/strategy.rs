#![forbid(unsafe_code)]

//! Mutation strategies.
//!
//! Both strategies share one contract: [`open`](Strategy::open) a draft over
//! the base state, let the caller run the mutator and hooks on it, then
//! [`commit`](Strategy::commit) the draft onto the live state and get back the
//! top-level keys that changed. The model logic around them is identical.
//!
//! # Manual
//!
//! The draft is a plain copy. After the mutator ran, base and draft are
//! compared key by key with deep equality. The keys iterated are those of
//! whichever side has more entries; this misses a change where one key is
//! removed and another added in the same mutation. Set
//! [`ModelProps::exact_diff`] to iterate the union of both key sets instead.
//!
//! # Drafting
//!
//! The draft shares structure with the base and records patches. A `Replace`
//! patch marks its root key only if the root value differs between base and
//! draft; `Add` and `Remove` always mark. Only touched root keys whose value
//! differs from the base are written back, exactly as in manual mode, so a
//! field written by a nested `set_state` in the meantime is kept unless the
//! mutator itself changed it.
//!
//! # Invariants
//!
//! 1. A key is reported changed only if it was written by the mutator or a
//!    hook.
//! 2. After `commit`, every key whose value differs between base and draft
//!    holds the draft's value in the live state (or is absent if the draft
//!    removed it). Keys equal in base and draft keep their live value.
//! 3. `commit` never reports a key whose value is deep-equal in base and
//!    draft, except for `Add`/`Remove` patches in drafting mode.

use std::collections::BTreeSet;

use crate::capability::DraftSupport;
use crate::draft::{Draft, PatchOp};
use crate::props::ModelProps;
use crate::record::{self, StateRecord};

/// How mutations are applied and diffed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Clone, mutate, diff.
    Manual {
        /// Diff the union of old and new keys.
        exact: bool,
    },
    /// Structurally shared draft with patch capture.
    Drafting,
}

impl Strategy {
    /// Pick the strategy for a model: drafting unless it is unavailable or
    /// the props force manual mode.
    #[must_use]
    pub fn select(support: DraftSupport, props: &ModelProps) -> Self {
        if !support.is_available() || props.uses_dirty() {
            Strategy::Manual {
                exact: props.uses_exact_diff(),
            }
        } else {
            Strategy::Drafting
        }
    }

    #[must_use]
    pub fn is_drafting(self) -> bool {
        self == Strategy::Drafting
    }

    /// Draft for a mutator to work on.
    #[must_use]
    pub fn open(self, base: &StateRecord) -> Draft {
        match self {
            Strategy::Manual { .. } => Draft::untracked(record::deep_copy(base)),
            Strategy::Drafting => Draft::tracked(base.clone()),
        }
    }

    /// Externally visible copy of `state`.
    #[must_use]
    pub fn snapshot(self, state: &StateRecord) -> StateRecord {
        match self {
            Strategy::Manual { .. } => record::deep_copy(state),
            Strategy::Drafting => state.clone(),
        }
    }

    /// Write the draft's changes into `live` and return one entry per dirty
    /// mark, in the order they were found.
    pub fn commit(self, live: &mut StateRecord, base: &StateRecord, draft: Draft) -> Vec<String> {
        match self {
            Strategy::Manual { exact } => commit_manual(live, base, draft, exact),
            Strategy::Drafting => commit_drafting(live, base, draft),
        }
    }
}

fn commit_manual(live: &mut StateRecord, base: &StateRecord, draft: Draft, exact: bool) -> Vec<String> {
    let (next, _) = draft.into_parts();
    let keys: Vec<String> = if exact {
        base.keys()
            .chain(next.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    } else if next.len() > base.len() {
        next.keys().cloned().collect()
    } else {
        base.keys().cloned().collect()
    };

    let mut changed = Vec::new();
    for key in keys {
        let new = next.get(&key);
        if base.get(&key) == new {
            continue;
        }
        match new {
            Some(value) => {
                live.insert(key.clone(), value.clone());
            }
            None => {
                live.remove(&key);
            }
        }
        changed.push(key);
    }
    changed
}

fn commit_drafting(live: &mut StateRecord, base: &StateRecord, draft: Draft) -> Vec<String> {
    let (next, patches) = draft.into_parts();
    let mut changed = Vec::new();
    let mut touched = BTreeSet::new();

    for patch in &patches {
        let Some(root) = patch.root_key() else {
            continue;
        };
        touched.insert(root.to_owned());
        match patch.op {
            PatchOp::Replace => {
                if base.get(root) != next.get(root) {
                    changed.push(root.to_owned());
                }
            }
            PatchOp::Add | PatchOp::Remove => changed.push(root.to_owned()),
        }
    }

    for key in touched {
        let value = next.get(&key);
        if base.get(&key) == value {
            continue;
        }
        match value {
            Some(value) => {
                live.insert(key, value.clone());
            }
            None => {
                live.remove(&key);
            }
        }
    }
    changed
}
