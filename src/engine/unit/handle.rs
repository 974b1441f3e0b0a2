use super::controller::Presentation;
use super::state::{PresentationState, UnitEvent};
use super::worker::{lock, SharedCore};
use super::{UnitId, UnitKind};
use crate::engine::events::PageEvent;
use crate::engine::subscription::Subscription;
use crate::engine::viewport::GateCanceller;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

/// Everything a unit holds on page-wide services. Dropping it detaches them.
pub(crate) struct Registrations {
    pub _preference: Subscription,
    pub _scroll: Option<Subscription>,
    pub gate: Option<GateCanceller>,
}

/// Host-side handle for a mounted unit.
///
/// Dropping the handle unmounts the unit.
pub struct UnitHandle {
    id: UnitId,
    kind: UnitKind,
    core: SharedCore,
    registrations: Mutex<Option<Registrations>>,
    cancel: CancellationToken,
    event_tx: broadcast::Sender<PageEvent>,
    live: Arc<AtomicUsize>,
}

impl std::fmt::Debug for UnitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

impl UnitHandle {
    pub(crate) fn new(
        id: UnitId,
        kind: UnitKind,
        core: SharedCore,
        registrations: Registrations,
        cancel: CancellationToken,
        event_tx: broadcast::Sender<PageEvent>,
        live: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            id,
            kind,
            core,
            registrations: Mutex::new(Some(registrations)),
            cancel,
            event_tx,
            live,
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn presentation(&self) -> Presentation {
        lock(&self.core).presentation()
    }

    pub fn state(&self) -> PresentationState {
        self.presentation().state
    }

    /// Stream of presentations. The current one is available immediately.
    pub fn watch(&self) -> watch::Receiver<Presentation> {
        lock(&self.core).watch()
    }

    pub fn is_released(&self) -> bool {
        self.state().is_released()
    }

    /// Unmount the unit. Everything is released before this returns: the
    /// viewport observation, the preference and scroll subscriptions, the
    /// backend mount and the worker. A load still in flight is dropped.
    ///
    /// Calling it again is a no-op.
    pub fn unmount(&self) {
        let registrations = self.registrations.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(registrations) = registrations else {
            return;
        };

        if let Some(gate) = &registrations.gate {
            gate.cancel();
        }
        drop(registrations);
        self.cancel.cancel();

        lock(&self.core).dispatch(UnitEvent::Unmount);
        let _ = self.event_tx.send(PageEvent::UnitReleased { unit: self.id });
        self.live.fetch_sub(1, Ordering::SeqCst);

        log::info!("Unit[{}]: released", self.id);
    }
}

impl Drop for UnitHandle {
    fn drop(&mut self) {
        self.unmount();
    }
}
