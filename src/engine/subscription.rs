//! Callback registry with RAII disposers.
//!
//! [`Listeners`] keeps callbacks in subscription order. [`Subscription`] is the
//! disposer handed back to the subscriber: calling
//! [`unsubscribe`](Subscription::unsubscribe) or dropping it detaches the
//! callback. Callbacks are invoked outside the registry lock, so a callback may
//! subscribe or unsubscribe without deadlocking. The occupancy hook is the
//! exception: it runs under the lock, so occupied/empty reports never reorder,
//! and it must not touch the registry.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type OccupancyHook = Box<dyn Fn(bool) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback<T>>,
}

struct Inner<T> {
    registry: Mutex<Registry<T>>,
    /// Called with `true` when the first subscriber arrives and `false` when the last one leaves.
    on_occupancy: Option<OccupancyHook>,
}

/// Ordered set of subscriber callbacks receiving `&T`.
pub struct Listeners<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: 'static> Debug for Listeners<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish()
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Registry that reports when it goes from empty to occupied and back.
    pub fn with_occupancy_hook(hook: impl Fn(bool) + Send + Sync + 'static) -> Self {
        Self::build(Some(Box::new(hook)))
    }

    fn build(on_occupancy: Option<OccupancyHook>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry { next_id: 0, callbacks: BTreeMap::new() }),
                on_occupancy,
            }),
        }
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut reg = self.inner.registry.lock().unwrap_or_else(|e| e.into_inner());
            let id = reg.next_id;
            reg.next_id += 1;
            reg.callbacks.insert(id, Arc::new(callback));
            if reg.callbacks.len() == 1 {
                if let Some(hook) = &self.inner.on_occupancy {
                    hook(true);
                }
            }
            id
        };

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    remove(&inner, id);
                }
            })),
        }
    }

    /// Deliver `value` to every subscriber, in subscription order.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = {
            let reg = self.inner.registry.lock().unwrap_or_else(|e| e.into_inner());
            reg.callbacks.values().cloned().collect()
        };

        for cb in snapshot {
            cb(value);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.registry.lock().map(|r| r.callbacks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn remove<T>(inner: &Inner<T>, id: u64) {
    // Dropped after the lock is released: a callback may own subscriptions of its own.
    let _removed = {
        let mut reg = inner.registry.lock().unwrap_or_else(|e| e.into_inner());
        let removed = reg.callbacks.remove(&id);
        if removed.is_some() && reg.callbacks.is_empty() {
            if let Some(hook) = &inner.on_occupancy {
                hook(false);
            }
        }
        removed
    };
}

/// Disposer for a subscription. Detaches on [`unsubscribe`](Self::unsubscribe) or drop.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("attached", &self.detach.is_some()).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn callbacks_fire_in_subscription_order() {
        let listeners = Listeners::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s1 = { let seen = seen.clone(); listeners.subscribe(move |v| seen.lock().unwrap().push(("first", *v))) };
        let s2 = { let seen = seen.clone(); listeners.subscribe(move |v| seen.lock().unwrap().push(("second", *v))) };

        listeners.emit(&1);
        listeners.emit(&2);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 1), ("second", 1), ("first", 2), ("second", 2)]
        );
        drop((s1, s2));
    }

    #[test]
    fn dropping_subscription_detaches() {
        let listeners = Listeners::<u32>::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let sub = { let hits = hits.clone(); listeners.subscribe(move |_| { hits.fetch_add(1, Ordering::SeqCst); }) };
        listeners.emit(&0);
        assert_eq!(listeners.len(), 1);

        drop(sub);
        listeners.emit(&0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(listeners.is_empty());
    }

    #[test]
    fn occupancy_hook_tracks_first_and_last_subscriber() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listeners = {
            let log = log.clone();
            Listeners::<()>::with_occupancy_hook(move |on| log.lock().unwrap().push(on))
        };

        let a = listeners.subscribe(|_| {});
        let b = listeners.subscribe(|_| {});
        a.unsubscribe();
        assert_eq!(*log.lock().unwrap(), vec![true]);

        b.unsubscribe();
        assert_eq!(*log.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn occupancy_reports_alternate_under_concurrent_churn() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listeners = {
            let log = log.clone();
            Listeners::<()>::with_occupancy_hook(move |on| log.lock().unwrap().push(on))
        };

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let listeners = listeners.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let sub = listeners.subscribe(|_| {});
                        drop(sub);
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        let log = log.lock().unwrap();
        assert!(!log.is_empty());
        for (i, on) in log.iter().enumerate() {
            assert_eq!(*on, i % 2 == 0, "report {i} out of order");
        }
        assert_eq!(log.last(), Some(&false));
        assert!(listeners.is_empty());
    }

    #[test]
    fn callback_may_unsubscribe_itself_without_deadlock() {
        let listeners = Listeners::<()>::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let sub = {
            let slot = slot.clone();
            listeners.subscribe(move |_| {
                let taken = slot.lock().unwrap().take();
                drop(taken);
            })
        };
        *slot.lock().unwrap() = Some(sub);

        listeners.emit(&());
        assert!(listeners.is_empty());
    }

    #[test]
    fn callback_owning_a_subscription_can_be_dropped() {
        let listeners = Listeners::<()>::new();
        let inner = Mutex::new(Some(listeners.subscribe(|_| {})));
        let outer = listeners.subscribe(move |_| {
            let _held = inner.lock().unwrap().is_some();
        });
        assert_eq!(listeners.len(), 2);

        drop(outer);
        assert!(listeners.is_empty());
    }

    #[test]
    fn subscription_outliving_registry_is_harmless() {
        let listeners = Listeners::<()>::new();
        let sub = listeners.subscribe(|_| {});
        drop(listeners);
        sub.unsubscribe();
    }
}
