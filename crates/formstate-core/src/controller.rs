#![forbid(unsafe_code)]

//! The controller contract.
//!
//! A controller supplies a model's defaults and its optional hooks. Hooks
//! have no-op default implementations, so a controller overrides only what it
//! needs and the model calls every hook unconditionally.
//!
//! Hooks receive the draft or state as arguments for the duration of one
//! call; a controller must not try to keep them across calls.

use crate::dirty::DirtyMap;
use crate::draft::Draft;
use crate::props::ModelProps;
use crate::record::StateRecord;

/// Factory and hook set for a [`StateModel`](crate::StateModel).
pub trait StateController: Sized {
    /// Stamped onto the state as `displayName`.
    const DISPLAY_NAME: &'static str;

    /// Initial state record.
    fn default_state() -> StateRecord;

    /// Defaults that caller props are layered over.
    fn default_props() -> ModelProps {
        ModelProps::new()
    }

    /// Build the controller from the initial state and merged props.
    fn create(state: &StateRecord, props: &ModelProps) -> Self;

    /// Recompute derived fields after the mutator ran. `previous` is the live
    /// state the draft will be committed over.
    fn compute_state(&self, _draft: &mut Draft, _previous: &StateRecord) {}

    /// Declare extra dirty fields the automatic diff cannot see. Returned
    /// entries are merged into the model's dirty map.
    fn dirty_check(&self, _dirty: &DirtyMap) -> Option<DirtyMap> {
        None
    }

    /// Reshape the state before consumers see it. `None` publishes the state
    /// as is.
    fn publish_state(&self, _state: &StateRecord) -> Option<StateRecord> {
        None
    }
}
