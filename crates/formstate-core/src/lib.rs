#![forbid(unsafe_code)]

//! Dirty-tracking state container for form state models.
//!
//! A [`StateModel`] owns a [`StateRecord`] (top-level field name to JSON
//! value), applies mutations through a [`Draft`], records which top-level
//! fields changed in a [`DirtyMap`], and notifies subscribers at most once per
//! logical operation.
//!
//! - [`Notifier`] / [`Subscription`]: synchronous publish/subscribe.
//! - [`DraftSupport`]: whether copy-on-write drafting is available, resolved
//!   once per model.
//! - [`StateController`]: the per-model hooks (`compute_state`,
//!   `dirty_check`, `publish_state`) and defaults.
//! - [`Strategy`]: manual clone-and-diff or patch-recording drafts.
//!
//! # Example
//!
//! ```
//! use formstate_core::{ModelProps, StateController, StateModel, StateRecord};
//! use serde_json::json;
//!
//! struct Counter;
//!
//! impl StateController for Counter {
//!     const DISPLAY_NAME: &'static str = "Counter";
//!
//!     fn default_state() -> StateRecord {
//!         StateRecord::from_iter([("count".to_string(), json!(0))])
//!     }
//!
//!     fn create(_state: &StateRecord, _props: &ModelProps) -> Self {
//!         Counter
//!     }
//! }
//!
//! let model = StateModel::<Counter>::new(ModelProps::new());
//! let _sub = model.subscribe(|state| assert_eq!(state["count"], json!(1)));
//! model.set_state(|draft| draft.set("count", 1));
//! assert_eq!(model.get_state()["count"], json!(1));
//! ```

pub mod capability;
pub mod config;
pub mod controller;
pub mod dirty;
pub mod draft;
pub mod error;
pub mod model;
pub mod notifier;
pub mod path;
pub mod props;
pub mod record;
pub mod strategy;

pub use capability::DraftSupport;
pub use config::ModelConfig;
pub use controller::StateController;
pub use dirty::DirtyMap;
pub use draft::{Draft, Patch, PatchOp};
pub use error::{ConfigError, PathError};
pub use model::{BatchGuard, StateModel};
pub use notifier::{Notifier, Subscription};
pub use path::{FieldPath, Seg};
pub use props::{ComputeHook, ModelProps};
pub use record::StateRecord;
pub use strategy::Strategy;
