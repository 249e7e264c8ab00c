#![forbid(unsafe_code)]

//! The dirty-tracking state container.
//!
//! [`StateModel`] owns the state record, the dirty map of the current
//! mutation cycle, a `prev_state` snapshot, a reentrancy depth counter and a
//! batching flag. Mutations go through [`set_state`](StateModel::set_state);
//! the model applies them with its [`Strategy`], records changed top-level
//! fields, and notifies subscribers with a fresh snapshot.
//!
//! # Invariants
//!
//! 1. At most one notification per outermost non-batched `set_state`, and at
//!    most one per outermost batch; none when nothing changed.
//! 2. Nested `set_state` calls (from a mutator, a hook, or a batch callback)
//!    accumulate into the dirty map of the enclosing operation and never
//!    notify on their own. A change made by a nested non-silent call is
//!    announced when the outermost call exits, even if that call is silent.
//! 3. `prev_state` is refreshed only when the depth returns to zero through a
//!    non-deferred exit, after notification. Subscribers therefore observe
//!    `has_changed()` for the operation being announced.
//! 4. The dirty map is cleared at the start of each outermost non-batched
//!    mutation and after each notification. Dirty flags are visible to
//!    subscribers during notification and after silent or deferred calls.
//! 5. No `RefCell` borrow is held while mutators, hooks or subscribers run.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Subscriber keeps mutating | `set_state` on every notification | Follow-up rounds stop after [`MAX_NOTIFY_ROUNDS`], logged at `warn` |
//! | Malformed path | `has_changed_at("a..b")` | Logged at `warn`, reported unchanged |
//! | Escape hatch misuse | `unsafe_set_source_state` without a later `set_state` | `prev_state`/dirty map drift from the real state |
//! | Mutator or hook panic | Panic inside `set_state` | Propagates; depth is restored, dirty flags linger until the next outermost call |
//! | Subscriber panic | Panic during notification | Propagates; later subscribers in that round are skipped, the model notifies normally afterwards |

use std::cell::RefCell;

use serde_json::Value;

use crate::capability::DraftSupport;
use crate::config::ModelConfig;
use crate::controller::StateController;
use crate::dirty::DirtyMap;
use crate::draft::Draft;
use crate::notifier::{Notifier, Subscription};
use crate::path::FieldPath;
use crate::props::ModelProps;
use crate::record::{self, StateRecord};
use crate::strategy::Strategy;

/// State key the controller's display name is stamped under.
pub const DISPLAY_NAME_KEY: &str = "displayName";

/// Upper bound on notification rounds triggered by subscribers mutating the
/// model while being notified.
pub const MAX_NOTIFY_ROUNDS: usize = 32;

struct ModelCell {
    state: StateRecord,
    prev_state: StateRecord,
    dirty: DirtyMap,
    dirty_count: usize,
    stack_count: usize,
    batching: bool,
    notifying: bool,
    renotify: bool,
    /// A nested non-silent call deferred its notification to the outermost
    /// call.
    pending_notify: bool,
}

/// Leaves one `set_state` level on drop, including when unwinding.
struct DepthGuard<'a> {
    cell: &'a RefCell<ModelCell>,
    refresh_prev: bool,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        let Ok(mut cell) = self.cell.try_borrow_mut() else {
            return;
        };
        cell.stack_count = cell.stack_count.saturating_sub(1);
        if self.refresh_prev && cell.stack_count == 0 {
            cell.prev_state = record::deep_copy(&cell.state);
        }
    }
}

/// Ends a notification round on drop, including when a subscriber panics.
struct NotifyingGuard<'a> {
    cell: &'a RefCell<ModelCell>,
}

impl Drop for NotifyingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut cell) = self.cell.try_borrow_mut() {
            cell.notifying = false;
            if std::thread::panicking() {
                cell.renotify = false;
            }
        }
    }
}

/// Reactive, dirty-tracking container for one state record.
///
/// Single-threaded: share it with `Rc` when subscribers need to call back
/// into the model.
pub struct StateModel<C: StateController> {
    controller: C,
    props: ModelProps,
    strategy: Strategy,
    notifier: Notifier<StateRecord>,
    cell: RefCell<ModelCell>,
}

impl<C: StateController> StateModel<C> {
    /// Build a model using the process-wide drafting capability.
    #[must_use]
    pub fn new(overrides: ModelProps) -> Self {
        Self::with_support(overrides, DraftSupport::detect())
    }

    /// Build a model with an injected drafting capability.
    #[must_use]
    pub fn with_support(overrides: ModelProps, support: DraftSupport) -> Self {
        let props = C::default_props().merged(overrides);
        let strategy = Strategy::select(support, &props);

        let mut state = C::default_state();
        state.insert(
            DISPLAY_NAME_KEY.to_owned(),
            Value::String(C::DISPLAY_NAME.to_owned()),
        );
        let controller = C::create(&state, &props);

        tracing::debug!(
            display_name = C::DISPLAY_NAME,
            ?strategy,
            fields = state.len(),
            "state model created"
        );

        Self {
            controller,
            props,
            strategy,
            notifier: Notifier::new(),
            cell: RefCell::new(ModelCell {
                prev_state: record::deep_copy(&state),
                state,
                dirty: DirtyMap::new(),
                dirty_count: 0,
                stack_count: 0,
                batching: false,
                notifying: false,
                renotify: false,
                pending_notify: false,
            }),
        }
    }

    /// Build a model from a loaded [`ModelConfig`].
    #[must_use]
    pub fn from_config(config: &ModelConfig) -> Self {
        Self::with_support(config.to_props(), config.draft_support())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn display_name(&self) -> &'static str {
        C::DISPLAY_NAME
    }

    #[must_use]
    pub fn props(&self) -> &ModelProps {
        &self.props
    }

    #[must_use]
    pub fn controller(&self) -> &C {
        &self.controller
    }

    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Current reentrancy depth; zero when no `set_state` is running.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.cell.borrow().stack_count
    }

    #[must_use]
    pub fn is_batching(&self) -> bool {
        self.cell.borrow().batching
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.notifier.subscriber_count()
    }

    // -----------------------------------------------------------------------
    // Subscription
    // -----------------------------------------------------------------------

    /// Receive a snapshot after every announced change.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&StateRecord) + 'static) -> Subscription {
        self.notifier.subscribe(callback)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Apply `mutator` and notify subscribers if anything changed.
    pub fn set_state(&self, mutator: impl FnOnce(&mut Draft)) {
        self.apply(mutator, false);
    }

    /// Apply `mutator` and record dirty fields without notifying.
    pub fn set_state_silent(&self, mutator: impl FnOnce(&mut Draft)) {
        self.apply(mutator, true);
    }

    fn apply(&self, mutator: impl FnOnce(&mut Draft), silent: bool) {
        let base = {
            let mut cell = self.cell.borrow_mut();
            cell.stack_count += 1;
            if !cell.batching && !cell.notifying && cell.stack_count == 1 {
                cell.dirty.clear();
                cell.dirty_count = 0;
                cell.pending_notify = false;
            }
            cell.state.clone()
        };
        let mut depth = DepthGuard {
            cell: &self.cell,
            refresh_prev: false,
        };

        let mut draft = self.strategy.open(&base);
        mutator(&mut draft);
        let previous = self.cell.borrow().state.clone();
        if let Some(hook) = &self.props.compute_state {
            hook(&mut draft, &previous);
        }
        self.controller.compute_state(&mut draft, &previous);

        let dirty = {
            let mut cell = self.cell.borrow_mut();
            let cell = &mut *cell;
            let changed = self.strategy.commit(&mut cell.state, &base, draft);
            cell.dirty_count += changed.len();
            for key in changed {
                cell.dirty.mark(key);
            }
            cell.dirty.clone()
        };
        if let Some(extra) = self.controller.dirty_check(&dirty) {
            self.cell.borrow_mut().dirty.merge(extra);
        }

        {
            let mut cell = self.cell.borrow_mut();
            tracing::trace!(
                depth = cell.stack_count,
                dirty = cell.dirty_count,
                silent,
                "set_state applied"
            );
            let announce = !silent || cell.pending_notify;
            if cell.dirty_count > 0 && announce {
                if cell.notifying {
                    // Announced by the notification round in progress.
                    cell.renotify = true;
                    return;
                }
                if cell.batching {
                    return;
                }
                if cell.stack_count > 1 {
                    cell.pending_notify = true;
                    return;
                }
                drop(cell);
                self.flush();
            }
        }

        depth.refresh_prev = true;
    }

    /// Notify subscribers, repeating while subscribers queue further changes,
    /// then clear the dirty map.
    fn flush(&self) {
        let mut rounds = 0;
        loop {
            self.cell.borrow_mut().notifying = true;
            let round = NotifyingGuard { cell: &self.cell };
            let snapshot = self.get_state();
            if tracing::enabled!(tracing::Level::DEBUG) {
                let dirty = self.dirty_info();
                let keys: Vec<&str> = dirty.dirty_keys().collect();
                tracing::debug!(
                    display_name = C::DISPLAY_NAME,
                    ?keys,
                    round = rounds,
                    "notifying subscribers"
                );
            }
            self.notifier.notify(&snapshot);
            rounds += 1;
            drop(round);

            let mut cell = self.cell.borrow_mut();
            if !std::mem::take(&mut cell.renotify) {
                break;
            }
            if rounds >= MAX_NOTIFY_ROUNDS {
                tracing::warn!(
                    display_name = C::DISPLAY_NAME,
                    rounds,
                    "subscribers kept mutating state during notification; giving up"
                );
                break;
            }
        }

        let mut cell = self.cell.borrow_mut();
        cell.dirty.clear();
        cell.dirty_count = 0;
        cell.pending_notify = false;
    }

    /// Run `callback` with notifications deferred, then notify once if
    /// anything changed. Nested batches defer to the outermost one.
    pub fn batch(&self, callback: impl FnOnce()) {
        let _guard = self.batch_scope();
        callback();
    }

    /// RAII form of [`batch`](Self::batch): notifications are deferred until
    /// the guard drops.
    #[must_use = "dropping the guard ends the batch immediately"]
    pub fn batch_scope(&self) -> BatchGuard<'_, C> {
        let was_batching = std::mem::replace(&mut self.cell.borrow_mut().batching, true);
        BatchGuard {
            model: self,
            outermost: !was_batching,
        }
    }

    fn finish_batch(&self) {
        let (has_changes, notifying) = {
            let mut cell = self.cell.borrow_mut();
            cell.batching = false;
            (cell.dirty_count > 0, cell.notifying)
        };
        if notifying {
            // A subscriber opened this batch; the round in progress announces it.
            self.cell.borrow_mut().renotify |= has_changes;
            return;
        }
        if has_changes && !std::thread::panicking() {
            tracing::debug!(display_name = C::DISPLAY_NAME, "flushing batch");
            self.flush();
        }
        let mut cell = self.cell.borrow_mut();
        cell.dirty.clear();
        cell.dirty_count = 0;
        cell.pending_notify = false;
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Externally visible snapshot of the state.
    ///
    /// Uses the controller's `publish_state` when it provides one; otherwise
    /// a deep copy in manual mode or a shared snapshot in drafting mode.
    #[must_use]
    pub fn get_state(&self) -> StateRecord {
        let state = self.cell.borrow().state.clone();
        if let Some(published) = self.controller.publish_state(&state) {
            return published;
        }
        self.strategy.snapshot(&state)
    }

    /// Run a read-only transform over the externally visible snapshot.
    pub fn get_state_with<R>(&self, callback: impl FnOnce(&StateRecord) -> R) -> R {
        callback(&self.get_state())
    }

    /// The live state, bypassing `publish_state`.
    #[must_use]
    pub fn unsafe_get_source_state(&self) -> StateRecord {
        self.cell.borrow().state.clone()
    }

    /// Pass the live state to `callback`, bypassing `publish_state`.
    pub fn unsafe_get_source_state_with<R>(&self, callback: impl FnOnce(&StateRecord) -> R) -> R {
        let state = self.cell.borrow().state.clone();
        callback(&state)
    }

    /// Mutate the live state without diffing or notifying.
    ///
    /// The dirty map and `prev_state` are not updated, so they can drift from
    /// the real state until the next `set_state`.
    pub fn unsafe_set_source_state(&self, callback: impl FnOnce(&mut Draft)) {
        let mut draft = Draft::untracked(self.cell.borrow().state.clone());
        callback(&mut draft);
        let (next, _) = draft.into_parts();
        self.cell.borrow_mut().state = next;
    }

    // -----------------------------------------------------------------------
    // Dirty tracking
    // -----------------------------------------------------------------------

    /// Whether the current mutation cycle changed anything.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.cell.borrow().dirty_count > 0
    }

    /// Whether `key` is flagged in the current mutation cycle.
    #[must_use]
    pub fn is_field_dirty(&self, key: &str) -> bool {
        self.cell.borrow().dirty.is_dirty(key)
    }

    #[must_use]
    pub fn dirty_info(&self) -> DirtyMap {
        self.cell.borrow().dirty.clone()
    }

    /// Whether the state differs from the last `prev_state` snapshot.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        let cell = self.cell.borrow();
        cell.prev_state != cell.state
    }

    /// Whether the value at `path` differs from the last `prev_state`
    /// snapshot. Malformed paths are reported as unchanged.
    #[must_use]
    pub fn has_changed_at(&self, path: &str) -> bool {
        match FieldPath::parse(path) {
            Ok(path) => self.has_changed_path(&path),
            Err(err) => {
                tracing::warn!(path, %err, "has_changed_at: malformed path");
                false
            }
        }
    }

    #[must_use]
    pub fn has_changed_path(&self, path: &FieldPath) -> bool {
        let cell = self.cell.borrow();
        record::get_in(&cell.prev_state, path) != record::get_in(&cell.state, path)
    }
}

impl<C: StateController> std::fmt::Debug for StateModel<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cell = self.cell.borrow();
        f.debug_struct("StateModel")
            .field("display_name", &C::DISPLAY_NAME)
            .field("strategy", &self.strategy)
            .field("fields", &cell.state.len())
            .field("dirty", &cell.dirty)
            .field("depth", &cell.stack_count)
            .field("batching", &cell.batching)
            .field("subscribers", &self.notifier.subscriber_count())
            .finish()
    }
}

/// Ends a batch when dropped. Only the outermost guard notifies.
#[must_use = "dropping the guard ends the batch immediately"]
pub struct BatchGuard<'a, C: StateController> {
    model: &'a StateModel<C>,
    outermost: bool,
}

impl<C: StateController> Drop for BatchGuard<'_, C> {
    fn drop(&mut self) {
        if self.outermost {
            self.model.finish_batch();
        }
    }
}

impl<C: StateController> std::fmt::Debug for BatchGuard<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchGuard")
            .field("outermost", &self.outermost)
            .finish()
    }
}
