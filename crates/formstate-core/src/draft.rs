#![forbid(unsafe_code)]

//! The working copy handed to mutators.
//!
//! A [`Draft`] owns a [`StateRecord`] taken from the model. All writes go
//! through its methods, so a tracked draft can record an ordered list of
//! [`Patch`]es describing every structural change, the way a copy-on-write
//! transaction would. Untracked drafts (manual strategy, privileged writes)
//! skip the bookkeeping and are diffed afterwards instead.
//!
//! Cloning the record is O(1); a write copies only the path from the map root
//! to the touched entry, so unchanged fields stay shared with the model state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::{FieldPath, Seg};
use crate::record::{self, StateRecord};

/// Kind of structural change a [`Patch`] records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOp {
    /// A value appeared where there was none.
    Add,
    /// An existing value was overwritten.
    Replace,
    /// A value was deleted.
    Remove,
}

/// One recorded change: `{path, op, value}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub path: FieldPath,
    pub op: PatchOp,
    /// New value for `Add`/`Replace`; `None` for `Remove`.
    pub value: Option<Value>,
}

impl Patch {
    /// Top-level field the patch touches.
    #[must_use]
    pub fn root_key(&self) -> Option<&str> {
        self.path.root_key()
    }
}

/// Mutable working copy of a state record.
#[derive(Clone, Debug)]
pub struct Draft {
    record: StateRecord,
    patches: Option<Vec<Patch>>,
}

impl Draft {
    /// Draft that records patches for every write.
    #[must_use]
    pub fn tracked(base: StateRecord) -> Self {
        Self {
            record: base,
            patches: Some(Vec::new()),
        }
    }

    /// Draft that applies writes without recording them.
    #[must_use]
    pub fn untracked(base: StateRecord) -> Self {
        Self {
            record: base,
            patches: None,
        }
    }

    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.patches.is_some()
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.record.get(key)
    }

    #[must_use]
    pub fn get_in(&self, path: &FieldPath) -> Option<&Value> {
        record::get_in(&self.record, path)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.record.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.record.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.record.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    /// Current contents of the draft.
    #[must_use]
    pub fn record(&self) -> &StateRecord {
        &self.record
    }

    /// Patches recorded so far (empty for untracked drafts).
    #[must_use]
    pub fn patches(&self) -> &[Patch] {
        self.patches.as_deref().unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Set a top-level field.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let op = if self.record.contains_key(&key) {
            PatchOp::Replace
        } else {
            PatchOp::Add
        };
        self.push_patch(FieldPath::key(key.clone()), op, Some(&value));
        self.record.insert(key, value);
    }

    /// Remove a top-level field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.record.remove(key)?;
        self.push_patch(FieldPath::key(key), PatchOp::Remove, None);
        Some(removed)
    }

    /// Edit a top-level field in place. A missing field starts as `null` and
    /// is added.
    pub fn update(&mut self, key: &str, f: impl FnOnce(&mut Value)) {
        let existing = self.record.get(key).cloned();
        let op = if existing.is_some() {
            PatchOp::Replace
        } else {
            PatchOp::Add
        };
        let mut value = existing.unwrap_or(Value::Null);
        f(&mut value);
        self.push_patch(FieldPath::key(key), op, Some(&value));
        self.record.insert(key.to_owned(), value);
    }

    /// Write `value` at a nested path, creating intermediate objects/arrays.
    ///
    /// Returns `false` (and changes nothing) when the path does not start with
    /// a field name or a scalar value is in the way.
    pub fn set_in(&mut self, path: &FieldPath, value: impl Into<Value>) -> bool {
        let Some((Seg::Key(root), rest)) = path.segments().split_first() else {
            return false;
        };
        let value = value.into();
        if rest.is_empty() {
            self.set(root.clone(), value);
            return true;
        }

        let op = if self.get_in(path).is_some() {
            PatchOp::Replace
        } else {
            PatchOp::Add
        };
        let mut root_value = self.record.get(root.as_str()).cloned().unwrap_or(Value::Null);
        let Some(slot) = record::resolve_mut(&mut root_value, rest) else {
            return false;
        };
        self.push_patch(path.clone(), op, Some(&value));
        *slot = value;
        self.record.insert(root.clone(), root_value);
        true
    }

    /// Delete the value at a nested path. Array elements after a removed index
    /// shift down.
    pub fn remove_in(&mut self, path: &FieldPath) -> Option<Value> {
        let (Seg::Key(root), rest) = path.segments().split_first()? else {
            return None;
        };
        let Some((last, parent)) = rest.split_last() else {
            return self.remove(root);
        };
        self.get_in(path)?;

        let mut root_value = self.record.get(root.as_str())?.clone();
        let container = record::resolve_mut(&mut root_value, parent)?;
        let removed = match (container, last) {
            (Value::Object(map), seg) => map.remove(seg.to_key().as_ref())?,
            (Value::Array(items), seg) => {
                let i = match seg {
                    Seg::Index(i) => *i,
                    Seg::Key(k) => k.parse::<usize>().ok()?,
                };
                items.remove(i)
            }
            _ => return None,
        };
        self.push_patch(path.clone(), PatchOp::Remove, None);
        self.record.insert(root.clone(), root_value);
        Some(removed)
    }

    /// Swap in a whole new record, recording a patch per affected field.
    pub fn replace(&mut self, next: StateRecord) {
        if self.patches.is_some() {
            let removed: Vec<String> = self
                .record
                .keys()
                .filter(|k| !next.contains_key(k.as_str()))
                .cloned()
                .collect();
            for key in removed {
                self.push_patch(FieldPath::key(key), PatchOp::Remove, None);
            }
            for (key, value) in &next {
                let op = if self.record.contains_key(key) {
                    PatchOp::Replace
                } else {
                    PatchOp::Add
                };
                self.push_patch(FieldPath::key(key.clone()), op, Some(value));
            }
        }
        self.record = next;
    }

    pub(crate) fn into_parts(self) -> (StateRecord, Vec<Patch>) {
        (self.record, self.patches.unwrap_or_default())
    }

    fn push_patch(&mut self, path: FieldPath, op: PatchOp, value: Option<&Value>) {
        if let Some(patches) = self.patches.as_mut() {
            patches.push(Patch {
                path,
                op,
                value: value.cloned(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> StateRecord {
        record::from_json(json!({ "a": 1, "list": [1, 2, 3], "user": { "name": "ada" } }))
            .expect("object")
    }

    fn ops(draft: &Draft) -> Vec<(String, PatchOp)> {
        draft
            .patches()
            .iter()
            .map(|p| (p.path.to_string(), p.op))
            .collect()
    }

    #[test]
    fn set_records_add_or_replace() {
        let mut draft = Draft::tracked(base());
        draft.set("a", 2);
        draft.set("b", "new");
        assert_eq!(
            ops(&draft),
            vec![("a".into(), PatchOp::Replace), ("b".into(), PatchOp::Add)]
        );
        assert_eq!(draft.get("a"), Some(&json!(2)));
        assert_eq!(draft.patches()[1].value, Some(json!("new")));
    }

    #[test]
    fn remove_records_only_existing_keys() {
        let mut draft = Draft::tracked(base());
        assert_eq!(draft.remove("missing"), None);
        assert_eq!(draft.remove("a"), Some(json!(1)));
        assert_eq!(ops(&draft), vec![("a".into(), PatchOp::Remove)]);
        assert_eq!(draft.patches()[0].value, None);
    }

    #[test]
    fn update_edits_in_place() {
        let mut draft = Draft::tracked(base());
        draft.update("list", |v| {
            if let Value::Array(items) = v {
                items.push(json!(4));
            }
        });
        draft.update("counter", |v| *v = json!(1));
        assert_eq!(draft.get("list"), Some(&json!([1, 2, 3, 4])));
        assert_eq!(
            ops(&draft),
            vec![("list".into(), PatchOp::Replace), ("counter".into(), PatchOp::Add)]
        );
    }

    #[test]
    fn nested_writes_keep_full_paths() {
        let mut draft = Draft::tracked(base());
        let name = FieldPath::parse("user.name").unwrap();
        let email = FieldPath::parse("user.email").unwrap();
        assert!(draft.set_in(&name, "grace"));
        assert!(draft.set_in(&email, "g@example.com"));
        assert_eq!(
            ops(&draft),
            vec![("user.name".into(), PatchOp::Replace), ("user.email".into(), PatchOp::Add)]
        );
        assert_eq!(draft.patches()[0].root_key(), Some("user"));
        assert_eq!(
            draft.get("user"),
            Some(&json!({ "name": "grace", "email": "g@example.com" }))
        );
    }

    #[test]
    fn set_in_blocked_by_scalar_changes_nothing() {
        let mut draft = Draft::tracked(base());
        let path = FieldPath::parse("a.b").unwrap();
        assert!(!draft.set_in(&path, 1));
        assert!(draft.patches().is_empty());
        assert_eq!(draft.get("a"), Some(&json!(1)));
    }

    #[test]
    fn set_in_appends_but_rejects_gaps() {
        let mut draft = Draft::tracked(base());
        let append = FieldPath::parse("list[3]").unwrap();
        assert!(draft.set_in(&append, 4));
        assert_eq!(draft.get("list"), Some(&json!([1, 2, 3, 4])));

        for raw in ["list[9]", "list[18446744073709551615]", "list[1000000000]"] {
            let path = FieldPath::parse(raw).unwrap();
            assert!(!draft.set_in(&path, 0), "{raw}");
        }
        assert_eq!(ops(&draft), vec![("list[3]".into(), PatchOp::Add)]);
        assert_eq!(draft.get("list"), Some(&json!([1, 2, 3, 4])));
    }

    #[test]
    fn remove_in_shifts_arrays() {
        let mut draft = Draft::tracked(base());
        let second = FieldPath::parse("list[1]").unwrap();
        assert_eq!(draft.remove_in(&second), Some(json!(2)));
        assert_eq!(draft.get("list"), Some(&json!([1, 3])));
        let missing = FieldPath::parse("user.age").unwrap();
        assert_eq!(draft.remove_in(&missing), None);
        assert_eq!(ops(&draft), vec![("list[1]".into(), PatchOp::Remove)]);
    }

    #[test]
    fn replace_records_per_field() {
        let mut draft = Draft::tracked(base());
        let next = record::from_json(json!({ "a": 1, "z": true })).unwrap();
        draft.replace(next.clone());
        let mut got = ops(&draft);
        got.sort();
        assert_eq!(
            got,
            vec![
                ("a".into(), PatchOp::Replace),
                ("list".into(), PatchOp::Remove),
                ("user".into(), PatchOp::Remove),
                ("z".into(), PatchOp::Add),
            ]
        );
        assert_eq!(draft.record(), &next);
    }

    #[test]
    fn untracked_drafts_record_nothing() {
        let mut draft = Draft::untracked(base());
        draft.set("a", 5);
        draft.remove("list");
        assert!(!draft.is_tracking());
        assert!(draft.patches().is_empty());
        let (record, patches) = draft.into_parts();
        assert_eq!(record.get("a"), Some(&json!(5)));
        assert!(patches.is_empty());
    }

    #[test]
    fn writes_do_not_touch_the_source() {
        let source = base();
        let mut draft = Draft::tracked(source.clone());
        draft.set("a", 99);
        assert_eq!(source.get("a"), Some(&json!(1)));
    }
}
