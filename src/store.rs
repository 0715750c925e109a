//! Reactive value container
//!
//! A single-threaded observable value. Subscribers are called immediately
//! with the current value and then on every change, in registration order.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

type Callback<T> = RefCell<Box<dyn FnMut(&T)>>;

/// A registered subscriber
struct Subscriber<T> {
    id: u64,
    active: Cell<bool>,
    callback: Callback<T>,
}

struct Inner<T> {
    value: RefCell<T>,
    subscribers: RefCell<Vec<Rc<Subscriber<T>>>>,
    /// Notifications waiting to be delivered (filled by re-entrant sets)
    queue: RefCell<VecDeque<(Rc<Subscriber<T>>, T)>>,
    notifying: Cell<bool>,
    next_id: Cell<u64>,
}

/// Observable mutable value, shared by cloning
pub struct Writable<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Writable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Writable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                subscribers: RefCell::new(Vec::new()),
                queue: RefCell::new(VecDeque::new()),
                notifying: Cell::new(false),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Current value
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Register a callback. It runs right away with the current value.
    #[must_use = "dropping the handle keeps the subscription alive forever"]
    pub fn subscribe(&self, callback: impl FnMut(&T) + 'static) -> Unsubscriber<T> {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        let subscriber = Rc::new(Subscriber {
            id,
            active: Cell::new(true),
            callback: RefCell::new(Box::new(callback)),
        });
        self.inner.subscribers.borrow_mut().push(Rc::clone(&subscriber));

        let current = self.get();
        if self.inner.notifying.get() {
            (subscriber.callback.borrow_mut())(&current);
        } else {
            // Sets made by the first callback are queued and delivered once
            // it returns, this subscriber included
            let _guard = NotifyGuard::enter(&*self.inner);
            (subscriber.callback.borrow_mut())(&current);
            self.drain();
        }

        Unsubscriber {
            store: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Replace the value, notifying subscribers if it changed.
    ///
    /// If a subscriber panics, the value is already stored and the
    /// notifications still owed to later subscribers stay queued; the next
    /// `set` (or `subscribe`) delivers them before its own.
    pub fn set(&self, value: T) {
        if *self.inner.value.borrow() == value {
            return;
        }
        *self.inner.value.borrow_mut() = value.clone();

        {
            let subscribers = self.inner.subscribers.borrow();
            let mut queue = self.inner.queue.borrow_mut();
            for subscriber in subscribers.iter() {
                queue.push_back((Rc::clone(subscriber), value.clone()));
            }
        }

        // A set from inside a callback only enqueues; the outer call drains
        if self.inner.notifying.get() {
            return;
        }
        let _guard = NotifyGuard::enter(&*self.inner);
        self.drain();
    }

    /// Deliver queued notifications. Caller holds the `NotifyGuard`.
    fn drain(&self) {
        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some((subscriber, value)) = next else {
                break;
            };
            if subscriber.active.get() {
                (subscriber.callback.borrow_mut())(&value);
            }
        }
    }

    /// Apply `f` to the current value and `set` the result
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let current = self.get();
        self.set(f(&current));
    }
}

/// Marks the store as notifying; on exit (including unwinding) it resets the
/// flag. Undelivered notifications are left in the queue.
struct NotifyGuard<'a, T> {
    inner: &'a Inner<T>,
}

impl<'a, T> NotifyGuard<'a, T> {
    fn enter(inner: &'a Inner<T>) -> Self {
        inner.notifying.set(true);
        Self { inner }
    }
}

impl<T> Drop for NotifyGuard<'_, T> {
    fn drop(&mut self) {
        self.inner.notifying.set(false);
    }
}

/// Handle returned by [`Writable::subscribe`]
pub struct Unsubscriber<T> {
    store: Weak<Inner<T>>,
    id: u64,
}

impl<T> Unsubscriber<T> {
    /// Remove the subscription. Queued notifications for it are skipped.
    pub fn unsubscribe(self) {
        let Some(inner) = self.store.upgrade() else {
            return;
        };
        inner.subscribers.borrow_mut().retain(|s| {
            if s.id == self.id {
                s.active.set(false);
                false
            } else {
                true
            }
        });
    }
}

impl<T> std::fmt::Debug for Unsubscriber<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscriber").field("id", &self.id).finish()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Writable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writable")
            .field("value", &*self.inner.value.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + 'static>() -> (Rc<RefCell<Vec<T>>>, impl FnMut(&T) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |v: &T| sink.borrow_mut().push(v.clone()))
    }

    #[test]
    fn test_subscribe_receives_current_value() {
        let store = Writable::new(Some(3_i64));
        let (seen, cb) = recorder();
        let _sub = store.subscribe(cb);
        assert_eq!(*seen.borrow(), vec![Some(3)]);
    }

    #[test]
    fn test_set_and_update_notify() {
        let store = Writable::new(None::<i64>);
        let (seen, cb) = recorder();
        let _sub = store.subscribe(cb);

        store.set(Some(5));
        store.update(|v| v.map_or(Some(0), |n| Some(n + 1)));
        store.set(None);

        assert_eq!(*seen.borrow(), vec![None, Some(5), Some(6), None]);
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_equal_set_is_silent() {
        let store = Writable::new(7_i64);
        let (seen, cb) = recorder();
        let _sub = store.subscribe(cb);

        store.set(7);
        store.set(8);
        store.set(8);

        assert_eq!(*seen.borrow(), vec![7, 8]);
    }

    #[test]
    fn test_subscribers_called_in_registration_order() {
        let store = Writable::new(0_i64);
        let order = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&order);
        let b = Rc::clone(&order);
        let _first = store.subscribe(move |v| a.borrow_mut().push(("a", *v)));
        let _second = store.subscribe(move |v| b.borrow_mut().push(("b", *v)));

        store.set(1);

        assert_eq!(
            *order.borrow(),
            vec![("a", 0), ("b", 0), ("a", 1), ("b", 1)]
        );
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = Writable::new(0_i64);
        let (seen, cb) = recorder();
        let sub = store.subscribe(cb);
        assert_eq!(store.subscriber_count(), 1);

        store.set(1);
        sub.unsubscribe();
        store.set(2);

        assert_eq!(*seen.borrow(), vec![0, 1]);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_reentrant_set_is_delivered_in_order() {
        let store = Writable::new(0_i64);
        let inner = store.clone();
        let _bump = store.subscribe(move |v| {
            if *v == 1 {
                inner.set(2);
            }
        });
        let (seen, cb) = recorder();
        let _sub = store.subscribe(cb);

        store.set(1);

        // The second subscriber still sees 1 before 2
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
        assert_eq!(store.get(), 2);
    }

    #[test]
    fn test_unsubscribe_during_notification_skips_queued() {
        let store = Writable::new(0_i64);
        let victim: Rc<RefCell<Option<Unsubscriber<i64>>>> = Rc::new(RefCell::new(None));
        let handle = Rc::clone(&victim);
        let _killer = store.subscribe(move |v| {
            if *v == 1 {
                if let Some(sub) = handle.borrow_mut().take() {
                    sub.unsubscribe();
                }
            }
        });
        let (seen, cb) = recorder();
        *victim.borrow_mut() = Some(store.subscribe(cb));

        store.set(1);

        assert_eq!(*seen.borrow(), vec![0]);
    }

    #[test]
    fn test_panicking_subscriber_keeps_value() {
        let store = Writable::new(0_i64);
        let _bad = store.subscribe(|v| {
            if *v == 1 {
                panic!("subscriber failure");
            }
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| store.set(1)));
        assert!(result.is_err());
        assert_eq!(store.get(), 1);

        // Still usable afterwards
        store.set(2);
        assert_eq!(store.get(), 2);
    }

    #[test]
    fn test_panicking_subscriber_does_not_starve_later_ones() {
        let store = Writable::new(0_i64);
        let _bad = store.subscribe(|v| {
            if *v == 1 {
                panic!("subscriber failure");
            }
        });
        let (seen, cb) = recorder();
        let _sub = store.subscribe(cb);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| store.set(1)));
        assert!(result.is_err());
        assert_eq!(*seen.borrow(), vec![0]);

        // The owed 1 arrives ahead of 2
        store.set(2);
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_set_from_first_callback() {
        let store = Writable::new(Some(-1_i64));
        let handle = store.clone();
        let (seen, mut record) = recorder();
        let _reset = store.subscribe(move |v: &Option<i64>| {
            record(v);
            if *v == Some(-1) {
                handle.set(None);
            }
        });

        assert_eq!(store.get(), None);
        assert_eq!(*seen.borrow(), vec![Some(-1), None]);

        let (later, cb) = recorder();
        let _later = store.subscribe(cb);
        assert_eq!(*later.borrow(), vec![None]);
    }

    #[test]
    fn test_update_from_first_callback_reaches_others() {
        let store = Writable::new(0_i64);
        let (seen, cb) = recorder();
        let _first = store.subscribe(cb);

        let handle = store.clone();
        let _bump = store.subscribe(move |v| {
            if *v == 0 {
                handle.update(|n| n + 10);
            }
        });

        assert_eq!(store.get(), 10);
        assert_eq!(*seen.borrow(), vec![0, 10]);
    }

    #[test]
    fn test_unsubscribe_after_store_dropped() {
        let store = Writable::new(0_i64);
        let sub = store.subscribe(|_| {});
        drop(store);
        sub.unsubscribe();
    }
}
