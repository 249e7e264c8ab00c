#![forbid(unsafe_code)]

//! Synchronous publish/subscribe primitive.
//!
//! A [`Notifier<T>`] keeps an ordered list of callbacks and invokes all of
//! them with a borrowed value on [`notify`](Notifier::notify). It does no
//! batching and no deduplication; the state model decides when to notify.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 3. The subscriber list is not borrowed while callbacks run, so a callback
//!    may subscribe, unsubscribe, or trigger another notification.
//!
//! # Failure Modes
//!
//! - Callback panic: propagates to the caller of `notify()`; later
//!   subscribers in that cycle are skipped.
//! - Notifier dropped while subscriptions are alive: the subscriptions become
//!   inert handles.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback<T> = dyn Fn(&T);

struct NotifierInner<T> {
    /// Weak handles; the strong side lives in the `Subscription`.
    subscribers: Vec<Weak<Callback<T>>>,
}

/// An ordered set of callbacks invoked with a shared value.
///
/// Cloning a `Notifier` yields another handle to the same subscriber list.
pub struct Notifier<T> {
    inner: Rc<RefCell<NotifierInner<T>>>,
}

impl<T> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Notifier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<T> Notifier<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(NotifierInner {
                subscribers: Vec::new(),
            })),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Invoke every live callback with `value`, in registration order.
    ///
    /// Returns the number of callbacks invoked.
    pub fn notify(&self, value: &T) -> usize {
        let live: Vec<Rc<Callback<T>>> = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner.subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in &live {
            callback(value);
        }
        live.len()
    }
}

impl<T: 'static> Notifier<T> {
    /// Register `callback`. It stays registered while the returned
    /// [`Subscription`] is alive.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: Rc<Callback<T>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription {
            _callback: Box::new(strong),
        }
    }
}

/// RAII handle for a registered callback. Dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    _callback: Box<dyn Any>,
}

impl Subscription {
    /// Unsubscribe now. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
