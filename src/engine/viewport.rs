//! One-shot viewport gate.
//!
//! [`ViewportGate::observe`] registers an element with the platform
//! intersection primitive and hands back an [`Observation`]: a future that
//! resolves the first time the element's visible fraction reaches the
//! threshold. The gate releases the platform observation as soon as it
//! resolves, and [`GateCanceller::cancel`] (or dropping the observation)
//! releases it early. An element that is never attached never resolves.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Host reference to an element (selector, DOM id, ...). Opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl From<&str> for ElementRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifies one registration with an [`IntersectionObserver`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

pub type EnterCallback = Box<dyn FnOnce() + Send>;

/// Platform intersection primitive.
pub trait IntersectionObserver: Send + Sync {
    /// Start observing `element`. `on_enter` runs when the visible fraction first reaches `threshold`.
    fn observe(&self, element: &ElementRef, threshold: f32, on_enter: EnterCallback) -> ObserverId;

    /// Stop observing. Drops the pending callback if it has not run yet.
    fn unobserve(&self, id: ObserverId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Pending,
    Resolved,
    Cancelled,
}

#[derive(Debug)]
struct Slot {
    state: GateState,
    id: Option<ObserverId>,
}

/// Creates one-shot observations on top of the platform observer.
#[derive(Clone)]
pub struct ViewportGate {
    observer: Arc<dyn IntersectionObserver>,
}

impl std::fmt::Debug for ViewportGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportGate").finish_non_exhaustive()
    }
}

impl ViewportGate {
    pub fn new(observer: Arc<dyn IntersectionObserver>) -> Self {
        Self { observer }
    }

    pub fn observe(&self, element: &ElementRef, threshold: f32) -> Observation {
        let slot = Arc::new(Mutex::new(Slot { state: GateState::Pending, id: None }));
        let (tx, rx) = oneshot::channel();

        let cb_slot = slot.clone();
        let cb_observer: Weak<dyn IntersectionObserver> = Arc::downgrade(&self.observer);
        let on_enter: EnterCallback = Box::new(move || {
            let id = {
                let mut s = cb_slot.lock().unwrap_or_else(|e| e.into_inner());
                if s.state != GateState::Pending {
                    return;
                }
                s.state = GateState::Resolved;
                s.id.take()
            };

            if let (Some(id), Some(observer)) = (id, cb_observer.upgrade()) {
                observer.unobserve(id);
            }
            let _ = tx.send(());
        });

        let id = self.observer.observe(element, threshold, on_enter);

        // The platform may have fired synchronously, before we knew our id.
        let already_done = {
            let mut s = slot.lock().unwrap_or_else(|e| e.into_inner());
            match s.state {
                GateState::Pending => {
                    s.id = Some(id);
                    false
                }
                _ => true,
            }
        };
        if already_done {
            self.observer.unobserve(id);
        }

        log::debug!("observing {:?} at threshold {threshold}", element);

        Observation {
            canceller: GateCanceller { slot, observer: Arc::downgrade(&self.observer) },
            rx,
        }
    }
}

/// Cancels a pending observation. Cloneable so unmount can hold one.
#[derive(Clone)]
pub struct GateCanceller {
    slot: Arc<Mutex<Slot>>,
    observer: Weak<dyn IntersectionObserver>,
}

impl std::fmt::Debug for GateCanceller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateCanceller").field("state", &self.state()).finish()
    }
}

impl GateCanceller {
    pub fn state(&self) -> GateState {
        self.slot.lock().map(|s| s.state).unwrap_or(GateState::Cancelled)
    }

    /// Release the platform observation if still pending. No-op once resolved.
    pub fn cancel(&self) {
        let id = {
            let mut s = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            if s.state != GateState::Pending {
                return;
            }
            s.state = GateState::Cancelled;
            s.id.take()
        };

        if let (Some(id), Some(observer)) = (id, self.observer.upgrade()) {
            observer.unobserve(id);
        }
    }
}

/// Future resolving to [`GateState::Resolved`] on first qualifying intersection,
/// or [`GateState::Cancelled`] once the observation has been released.
pub struct Observation {
    canceller: GateCanceller,
    rx: oneshot::Receiver<()>,
}

impl Observation {
    pub fn canceller(&self) -> GateCanceller {
        self.canceller.clone()
    }

    pub fn state(&self) -> GateState {
        self.canceller.state()
    }
}

impl Future for Observation {
    type Output = GateState;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(())) => Poll::Ready(GateState::Resolved),
            Poll::Ready(Err(_)) => Poll::Ready(GateState::Cancelled),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.canceller.cancel();
    }
}

struct Registration {
    element: ElementRef,
    threshold: f32,
    /// Taken when fired; the registration stays until someone unobserves it.
    on_enter: Option<EnterCallback>,
}

#[derive(Default)]
struct IntersectionState {
    next_id: u64,
    registrations: HashMap<ObserverId, Registration>,
    /// Attached elements and their visible fraction.
    attached: HashMap<ElementRef, f32>,
}

/// In-memory intersection primitive. The host (or a test) attaches elements
/// and reports their visible fraction.
#[derive(Default)]
pub struct InMemoryIntersection {
    state: Mutex<IntersectionState>,
}

impl std::fmt::Debug for InMemoryIntersection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryIntersection")
            .field("registrations", &self.observer_count())
            .finish()
    }
}

impl InMemoryIntersection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live registrations (fired-but-not-released ones included).
    pub fn observer_count(&self) -> usize {
        self.state.lock().map(|s| s.registrations.len()).unwrap_or(0)
    }

    /// Attach `element` to the document with the given visible fraction.
    pub fn attach(&self, element: &ElementRef, visible_fraction: f32) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .attached
            .insert(element.clone(), visible_fraction);
        self.dispatch(element);
    }

    pub fn detach(&self, element: &ElementRef) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).attached.remove(element);
    }

    /// Report a new visible fraction for an attached element. Ignored for detached ones.
    pub fn set_visible_fraction(&self, element: &ElementRef, visible_fraction: f32) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match state.attached.get_mut(element) {
                Some(fraction) => *fraction = visible_fraction,
                None => return,
            }
        }
        self.dispatch(element);
    }

    fn dispatch(&self, element: &ElementRef) {
        let ready: Vec<EnterCallback> = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let Some(&fraction) = state.attached.get(element) else {
                return;
            };

            state
                .registrations
                .values_mut()
                .filter(|r| &r.element == element && qualifies(fraction, r.threshold))
                .filter_map(|r| r.on_enter.take())
                .collect()
        };

        for cb in ready {
            cb();
        }
    }
}

fn qualifies(fraction: f32, threshold: f32) -> bool {
    fraction > 0.0 && fraction >= threshold
}

impl IntersectionObserver for InMemoryIntersection {
    fn observe(&self, element: &ElementRef, threshold: f32, on_enter: EnterCallback) -> ObserverId {
        let id = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let id = ObserverId(state.next_id);
            state.next_id += 1;
            state.registrations.insert(
                id,
                Registration { element: element.clone(), threshold, on_enter: Some(on_enter) },
            );
            id
        };

        // Initial intersection report, like the platform's first callback.
        self.dispatch(element);
        id
    }

    fn unobserve(&self, id: ObserverId) {
        let removed = self.state.lock().unwrap_or_else(|e| e.into_inner()).registrations.remove(&id);
        // Drop the callback outside the lock
        drop(removed);
    }
}
