//! Reference controllers.

use formstate_core::record;
use formstate_core::{DirtyMap, Draft, ModelProps, StateController, StateRecord};
use serde_json::{Value, json};

fn record_of(value: Value) -> StateRecord {
    record::from_json(value).unwrap_or_default()
}

/// `{ count: 0 }`, no hooks.
#[derive(Debug)]
pub struct Counter;

impl StateController for Counter {
    const DISPLAY_NAME: &'static str = "Counter";

    fn default_state() -> StateRecord {
        record_of(json!({ "count": 0 }))
    }

    fn create(_state: &StateRecord, _props: &ModelProps) -> Self {
        Counter
    }
}

/// A small form: scalar fields plus a nested address and a tag list.
#[derive(Debug)]
pub struct Profile;

impl StateController for Profile {
    const DISPLAY_NAME: &'static str = "Profile";

    fn default_state() -> StateRecord {
        record_of(json!({
            "name": "",
            "email": "",
            "address": { "city": "", "zip": "" },
            "tags": [],
        }))
    }

    fn create(_state: &StateRecord, _props: &ModelProps) -> Self {
        Profile
    }
}

/// Flags `derived` on every mutation, whether or not it changed.
#[derive(Debug)]
pub struct AlwaysDerived;

impl StateController for AlwaysDerived {
    const DISPLAY_NAME: &'static str = "AlwaysDerived";

    fn default_state() -> StateRecord {
        record_of(json!({ "value": 0, "derived": null }))
    }

    fn create(_state: &StateRecord, _props: &ModelProps) -> Self {
        AlwaysDerived
    }

    fn dirty_check(&self, _dirty: &DirtyMap) -> Option<DirtyMap> {
        Some(DirtyMap::from_iter(["derived"]))
    }
}

/// Keeps `full_name` in sync with `first` and `last`.
#[derive(Debug)]
pub struct FullName {
    separator: String,
}

impl FullName {
    fn compose(&self, first: &str, last: &str) -> String {
        match (first.is_empty(), last.is_empty()) {
            (true, _) => last.to_owned(),
            (_, true) => first.to_owned(),
            _ => format!("{first}{}{last}", self.separator),
        }
    }
}

impl StateController for FullName {
    const DISPLAY_NAME: &'static str = "FullName";

    fn default_state() -> StateRecord {
        record_of(json!({ "first": "", "last": "", "full_name": "" }))
    }

    /// `separator` prop, default `" "`.
    fn default_props() -> ModelProps {
        ModelProps::new().with("separator", " ")
    }

    fn create(_state: &StateRecord, props: &ModelProps) -> Self {
        let separator = props
            .get("separator")
            .and_then(Value::as_str)
            .unwrap_or(" ")
            .to_owned();
        FullName { separator }
    }

    fn compute_state(&self, draft: &mut Draft, _previous: &StateRecord) {
        let first = draft.get("first").and_then(Value::as_str).unwrap_or("");
        let last = draft.get("last").and_then(Value::as_str).unwrap_or("");
        let full = self.compose(first, last);
        draft.set("full_name", full);
    }
}

/// Hides every field whose name starts with `_` from published snapshots.
#[derive(Debug)]
pub struct Redacted;

impl StateController for Redacted {
    const DISPLAY_NAME: &'static str = "Redacted";

    fn default_state() -> StateRecord {
        record_of(json!({ "value": "", "_token": "secret" }))
    }

    fn create(_state: &StateRecord, _props: &ModelProps) -> Self {
        Redacted
    }

    fn publish_state(&self, state: &StateRecord) -> Option<StateRecord> {
        Some(
            state
                .iter()
                .filter(|(key, _)| !key.starts_with('_'))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }
}
