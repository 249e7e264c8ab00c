#![forbid(unsafe_code)]

//! Per-cycle record of which top-level fields changed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level field name to "changed" flag.
///
/// Only keys touched in the current mutation cycle are present. A controller
/// may merge extra entries (including `false`) through
/// [`StateController::dirty_check`](crate::StateController::dirty_check);
/// [`is_dirty`](DirtyMap::is_dirty) only reports entries that are `true`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirtyMap(BTreeMap<String, bool>);

impl DirtyMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag `key` as changed.
    pub fn mark(&mut self, key: impl Into<String>) {
        self.0.insert(key.into(), true);
    }

    /// Set an explicit flag for `key`.
    pub fn insert(&mut self, key: impl Into<String>, dirty: bool) {
        self.0.insert(key.into(), dirty);
    }

    #[must_use]
    pub fn is_dirty(&self, key: &str) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    /// Copy every entry of `other` over this map. Existing keys not in
    /// `other` are kept.
    pub fn merge(&mut self, other: DirtyMap) {
        self.0.extend(other.0);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys flagged `true`, in key order.
    pub fn dirty_keys(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, dirty)| **dirty)
            .map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<K> for DirtyMap {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self(iter.into_iter().map(|k| (k.into(), true)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_and_query() {
        let mut dirty = DirtyMap::new();
        assert!(!dirty.is_dirty("a"));
        dirty.mark("a");
        assert!(dirty.is_dirty("a"));
        assert!(!dirty.is_dirty("b"));
    }

    #[test]
    fn merge_augments() {
        let mut dirty: DirtyMap = ["a"].into_iter().collect();
        let mut extra = DirtyMap::new();
        extra.mark("derived");
        extra.insert("hidden", false);
        dirty.merge(extra);

        assert!(dirty.is_dirty("a"));
        assert!(dirty.is_dirty("derived"));
        assert!(!dirty.is_dirty("hidden"));
        assert_eq!(dirty.len(), 3);
        assert_eq!(dirty.dirty_keys().collect::<Vec<_>>(), vec!["a", "derived"]);
    }

    #[test]
    fn serializes_as_plain_object() {
        let dirty: DirtyMap = ["x", "y"].into_iter().collect();
        let json = serde_json::to_value(&dirty).unwrap();
        assert_eq!(json, serde_json::json!({ "x": true, "y": true }));
    }
}
