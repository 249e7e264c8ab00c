#![forbid(unsafe_code)]

//! Model configuration merged from controller defaults and caller overrides.

use std::rc::Rc;

use serde_json::{Map, Value};

use crate::draft::Draft;
use crate::record::StateRecord;

/// Hook run after every mutator to recompute derived fields.
///
/// Receives the draft and the live state as it was before the draft is
/// committed.
pub type ComputeHook = Rc<dyn Fn(&mut Draft, &StateRecord)>;

/// Props for a [`StateModel`](crate::StateModel).
///
/// Recognized options are typed fields; anything else a controller wants
/// lives in `extra`.
#[derive(Clone, Default)]
pub struct ModelProps {
    /// Force the manual clone-and-diff strategy even when drafting is
    /// available.
    pub use_dirty: Option<bool>,
    /// Compare the union of old and new keys in the manual diff instead of
    /// the larger of the two key sets.
    pub exact_diff: Option<bool>,
    pub compute_state: Option<ComputeHook>,
    pub extra: Map<String, Value>,
}

impl ModelProps {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn use_dirty(mut self, enabled: bool) -> Self {
        self.use_dirty = Some(enabled);
        self
    }

    #[must_use]
    pub fn exact_diff(mut self, enabled: bool) -> Self {
        self.exact_diff = Some(enabled);
        self
    }

    #[must_use]
    pub fn compute_state(mut self, hook: impl Fn(&mut Draft, &StateRecord) + 'static) -> Self {
        self.compute_state = Some(Rc::new(hook));
        self
    }

    /// Set a free-form prop.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    #[must_use]
    pub fn uses_dirty(&self) -> bool {
        self.use_dirty.unwrap_or(false)
    }

    #[must_use]
    pub fn uses_exact_diff(&self) -> bool {
        self.exact_diff.unwrap_or(false)
    }

    /// Layer `overrides` on top of `self`. Options set in `overrides` win;
    /// `extra` entries are merged key by key.
    #[must_use]
    pub fn merged(mut self, overrides: ModelProps) -> Self {
        if overrides.use_dirty.is_some() {
            self.use_dirty = overrides.use_dirty;
        }
        if overrides.exact_diff.is_some() {
            self.exact_diff = overrides.exact_diff;
        }
        if overrides.compute_state.is_some() {
            self.compute_state = overrides.compute_state;
        }
        self.extra.extend(overrides.extra);
        self
    }
}

impl std::fmt::Debug for ModelProps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelProps")
            .field("use_dirty", &self.use_dirty)
            .field("exact_diff", &self.exact_diff)
            .field("compute_state", &self.compute_state.is_some())
            .field("extra", &self.extra)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overrides_win() {
        let defaults = ModelProps::new()
            .use_dirty(true)
            .with("label", "Name")
            .with("required", false);
        let merged = defaults.merged(ModelProps::new().with("required", true));

        assert!(merged.uses_dirty(), "unset override keeps the default");
        assert_eq!(merged.get("label"), Some(&json!("Name")));
        assert_eq!(merged.get("required"), Some(&json!(true)));
    }

    #[test]
    fn explicit_false_overrides_true() {
        let merged = ModelProps::new()
            .use_dirty(true)
            .merged(ModelProps::new().use_dirty(false));
        assert!(!merged.uses_dirty());
    }

    #[test]
    fn compute_hook_survives_merge() {
        let merged = ModelProps::new()
            .compute_state(|draft, _| draft.set("x", 1))
            .merged(ModelProps::new());
        assert!(merged.compute_state.is_some());
        assert!(format!("{merged:?}").contains("compute_state: true"));
    }
}
