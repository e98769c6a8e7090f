#![forbid(unsafe_code)]

//! Version-tracked shared values with change notification.
//!
//! [`Observable<T>`] is the reactive hook callers use to hold list data: the
//! coordinator subscribes to it and turns every change into a refresh
//! request.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op.
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//!
//! # Failure Modes
//!
//! - Subscriber panic: propagates to the caller of `set()`/`update()`; the
//!   value and version are already updated.
//! - Re-entrant `set()` from inside a subscriber: allowed, the inner change
//!   notifies with the inner value before the outer loop continues.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback<T> = dyn Fn(&T);

struct ObservableInner<T> {
    value: T,
    version: u64,
    /// Weak callbacks; dead entries are pruned during notification.
    subscribers: Vec<Weak<Callback<T>>>,
}

/// A shared, version-tracked value.
///
/// Cloning an `Observable` yields another handle to the **same** value.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Wrap an initial value (version 0).
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone out the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        f(&self.inner.borrow().value)
    }

    /// Number of value-changing mutations so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Replace the value, notifying subscribers if it changed.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
    }

    /// Mutate the value in place, notifying subscribers if it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.get();
        f(&mut next);
        self.set(next);
    }

    /// Register a change callback. Dropping the returned guard unsubscribes.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<Callback<T>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&callback));
        Subscription {
            _guard: Box::new(callback),
        }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    fn notify(&self) {
        let (value, live) = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            let live: Vec<Rc<Callback<T>>> =
                inner.subscribers.iter().filter_map(Weak::upgrade).collect();
            (inner.value.clone(), live)
        };
        for callback in live {
            callback(&value);
        }
    }
}

/// RAII guard for an [`Observable`] subscription.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn get_set_and_version() {
        let obs = Observable::new(1);
        assert_eq!(obs.get(), 1);
        assert_eq!(obs.version(), 0);
        obs.set(2);
        assert_eq!(obs.get(), 2);
        assert_eq!(obs.version(), 1);
    }

    #[test]
    fn equal_set_is_noop() {
        let obs = Observable::new(5);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = obs.subscribe(move |_| h.set(h.get() + 1));
        obs.set(5);
        assert_eq!(obs.version(), 0);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn subscribers_fire_in_order() {
        let obs = Observable::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = Rc::clone(&log);
        let l2 = Rc::clone(&log);
        let _a = obs.subscribe(move |v| l1.borrow_mut().push(("a", *v)));
        let _b = obs.subscribe(move |v| l2.borrow_mut().push(("b", *v)));
        obs.set(3);
        assert_eq!(*log.borrow(), vec![("a", 3), ("b", 3)]);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let obs = Observable::new(0);
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let sub = obs.subscribe(move |v| s.set(*v));
        assert_eq!(obs.subscriber_count(), 1);
        obs.set(1);
        drop(sub);
        assert_eq!(obs.subscriber_count(), 0);
        obs.set(2);
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn update_in_place() {
        let obs = Observable::new(vec![1, 2]);
        obs.update(|v| v.push(3));
        assert_eq!(obs.get(), vec![1, 2, 3]);
        assert_eq!(obs.version(), 1);
        obs.update(|_| {});
        assert_eq!(obs.version(), 1);
    }

    #[test]
    fn clones_share_state() {
        let a = Observable::new("x".to_string());
        let b = a.clone();
        b.set("y".to_string());
        assert_eq!(a.get(), "y");
        assert_eq!(a.with(|v| v.len()), 1);
    }
}
