#![forbid(unsafe_code)]

//! Property tests: drafting and exact manual diffing agree.
//!
//! For any sequence of top-level writes and removals, both strategies end in
//! the same state, flag the same fields, and notify the same number of times.

use formstate_core::{Draft, ModelProps};
use formstate_harness::fixtures::Profile;
use formstate_harness::{NotificationRecorder, strategy_matrix};
use proptest::prelude::*;
use serde_json::{Value, json};

#[derive(Clone, Debug)]
enum Op {
    Set(String, Value),
    Remove(String),
}

impl Op {
    fn apply(&self, draft: &mut Draft) {
        match self {
            Op::Set(key, value) => draft.set(key.clone(), value.clone()),
            Op::Remove(key) => {
                draft.remove(key);
            }
        }
    }
}

fn key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("name".to_string()),
        Just("email".to_string()),
        Just("tags".to_string()),
        Just("extra".to_string()),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!("")),
        Just(json!("x")),
        (0i64..3).prop_map(Value::from),
        Just(json!([])),
        Just(json!(["rust"])),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (key(), value()).prop_map(|(k, v)| Op::Set(k, v)),
        1 => key().prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn drafting_matches_exact_manual(calls in prop::collection::vec(prop::collection::vec(op(), 0..4), 1..8)) {
        let cases = strategy_matrix();
        let drafting = cases.iter().find(|c| c.label == "drafting").unwrap();
        let exact = cases.iter().find(|c| c.label == "exact_diff").unwrap();

        let a = drafting.build::<Profile>(ModelProps::new());
        let b = exact.build::<Profile>(ModelProps::new());
        let rec_a = NotificationRecorder::attach(&*a);
        let rec_b = NotificationRecorder::attach(&*b);

        for ops in &calls {
            a.set_state_silent(|d| ops.iter().for_each(|op| op.apply(d)));
            b.set_state_silent(|d| ops.iter().for_each(|op| op.apply(d)));
            let dirty_a: Vec<String> = a.dirty_info().dirty_keys().map(str::to_owned).collect();
            let dirty_b: Vec<String> = b.dirty_info().dirty_keys().map(str::to_owned).collect();
            prop_assert_eq!(a.get_state(), b.get_state());
            // Drafting also flags add-then-remove round trips; manual never does.
            for key in &dirty_b {
                prop_assert!(dirty_a.contains(key), "manual flagged {} but drafting did not", key);
            }
        }

        for ops in &calls {
            a.set_state(|d| ops.iter().rev().for_each(|op| op.apply(d)));
            b.set_state(|d| ops.iter().rev().for_each(|op| op.apply(d)));
            prop_assert_eq!(a.get_state(), b.get_state());
        }
        prop_assert!(rec_a.count() >= rec_b.count());
    }

    #[test]
    fn notifications_never_exceed_calls(calls in prop::collection::vec(prop::collection::vec(op(), 0..4), 0..8)) {
        for case in strategy_matrix() {
            let model = case.build::<Profile>(ModelProps::new());
            let recorder = NotificationRecorder::attach(&*model);
            for ops in &calls {
                model.set_state(|d| ops.iter().for_each(|op| op.apply(d)));
            }
            prop_assert!(recorder.count() <= calls.len());
            prop_assert!(!model.is_dirty());
            prop_assert_eq!(model.depth(), 0);
        }
    }
}
