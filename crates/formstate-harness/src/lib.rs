#![forbid(unsafe_code)]

//! Test harness for formstate models.
//!
//! - [`NotificationRecorder`]: counts notifications and keeps every snapshot.
//! - [`fixtures`]: small reference controllers exercising each hook.
//! - [`strategy_matrix`]: the model configurations every scenario should be
//!   run under.
//! - [`init_test_logging`]: route `tracing` output to the test writer.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use formstate_core::{DraftSupport, ModelProps, StateController, StateModel, StateRecord, Subscription};

pub mod fixtures;

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything. The
/// level comes from `FORMSTATE_LOG` (`trace`, `debug`, ...), defaulting to
/// `warn`.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let level = std::env::var("FORMSTATE_LOG")
            .ok()
            .and_then(|raw| raw.parse::<tracing::Level>().ok())
            .unwrap_or(tracing::Level::WARN);
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(level)
            .try_init();
    });
}

/// One model configuration in the matrix.
#[derive(Clone, Debug)]
pub struct StrategyCase {
    pub label: &'static str,
    pub support: DraftSupport,
    pub props: ModelProps,
}

impl StrategyCase {
    /// Build a model for this case, layering `props` over the case's props.
    #[must_use]
    pub fn build<C: StateController>(&self, props: ModelProps) -> Rc<StateModel<C>> {
        Rc::new(StateModel::with_support(
            self.props.clone().merged(props),
            self.support,
        ))
    }
}

/// Drafting, manual (unavailable capability), forced manual, and forced
/// manual with the exact key-union diff.
#[must_use]
pub fn strategy_matrix() -> Vec<StrategyCase> {
    vec![
        StrategyCase {
            label: "drafting",
            support: DraftSupport::Intercepted,
            props: ModelProps::new(),
        },
        StrategyCase {
            label: "manual",
            support: DraftSupport::Unavailable,
            props: ModelProps::new(),
        },
        StrategyCase {
            label: "use_dirty",
            support: DraftSupport::Intercepted,
            props: ModelProps::new().use_dirty(true),
        },
        StrategyCase {
            label: "exact_diff",
            support: DraftSupport::Unavailable,
            props: ModelProps::new().exact_diff(true),
        },
    ]
}

/// Records every notification a model sends.
///
/// Holds the subscription; dropping the recorder unsubscribes.
pub struct NotificationRecorder {
    snapshots: Rc<RefCell<Vec<StateRecord>>>,
    _subscription: Subscription,
}

impl NotificationRecorder {
    #[must_use]
    pub fn attach<C: StateController>(model: &StateModel<C>) -> Self {
        let snapshots = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&snapshots);
        let subscription = model.subscribe(move |state| sink.borrow_mut().push(state.clone()));
        Self {
            snapshots,
            _subscription: subscription,
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.snapshots.borrow().len()
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<StateRecord> {
        self.snapshots.borrow().clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<StateRecord> {
        self.snapshots.borrow().last().cloned()
    }

    /// Values of `key` across all snapshots, in notification order.
    #[must_use]
    pub fn values_of(&self, key: &str) -> Vec<Option<serde_json::Value>> {
        self.snapshots
            .borrow()
            .iter()
            .map(|snapshot| snapshot.get(key).cloned())
            .collect()
    }

    pub fn clear(&self) {
        self.snapshots.borrow_mut().clear();
    }
}

impl std::fmt::Debug for NotificationRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationRecorder")
            .field("count", &self.count())
            .finish()
    }
}
