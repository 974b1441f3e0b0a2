use super::controller::{Presentation, PresentationController, Transition};
use super::state::UnitEvent;
use super::UnitId;
use crate::engine::events::PageEvent;
use crate::engine::loader::LoadSet;
use crate::engine::scroll::ScrollMetric;
use crate::engine::viewport::{GateState, Observation};
use crate::render::{MountHandle, SharedBackend};
use futures::future::{pending, BoxFuture};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

/// State shared by a unit's worker and its handle. Every transition goes
/// through [`UnitCore::dispatch`], under the core's mutex.
pub(crate) struct UnitCore {
    controller: PresentationController,
    backend: SharedBackend,
    mounted: Option<MountHandle>,
    /// Set for scroll-linked units, to pick the right variant on activation.
    scroll: Option<Arc<ScrollMetric>>,
    event_tx: broadcast::Sender<PageEvent>,
    presentation_tx: watch::Sender<Presentation>,
}

pub(crate) type SharedCore = Arc<Mutex<UnitCore>>;

pub(crate) fn lock(core: &SharedCore) -> MutexGuard<'_, UnitCore> {
    core.lock().unwrap_or_else(|e| e.into_inner())
}

impl UnitCore {
    pub fn new(
        controller: PresentationController,
        backend: SharedBackend,
        scroll: Option<Arc<ScrollMetric>>,
        event_tx: broadcast::Sender<PageEvent>,
    ) -> Self {
        let (presentation_tx, _) = watch::channel(controller.presentation());
        Self {
            controller,
            backend,
            mounted: None,
            scroll,
            event_tx,
            presentation_tx,
        }
    }

    pub fn unit(&self) -> UnitId {
        self.controller.unit()
    }

    pub fn presentation(&self) -> Presentation {
        self.controller.presentation()
    }

    pub fn watch(&self) -> watch::Receiver<Presentation> {
        self.presentation_tx.subscribe()
    }

    /// Apply `event` and publish the result to the backend, the watchers and the page bus.
    pub fn dispatch(&mut self, event: UnitEvent) -> Option<Transition> {
        let settled = match &event {
            UnitEvent::Settled(set) => Some(set.clone()),
            _ => None,
        };

        let transition = self.controller.handle(&event)?;

        if let Some(set) = settled.filter(|s| !s.requested().is_empty()) {
            let _ = self.event_tx.send(PageEvent::LoadSettled {
                unit: self.unit(),
                succeeded: set.succeeded().iter().cloned().collect(),
                failed: set.failed().iter().cloned().collect(),
            });
        }
        self.commit(transition);

        // Freshly active scroll-linked units start on the variant for the current position.
        if transition.to.is_active() && !transition.from.is_active() {
            if let Some(progress) = self.scroll.as_ref().map(|s| s.current_progress()) {
                if let Some(follow) = self.controller.handle(&UnitEvent::ScrollProgress(progress)) {
                    self.commit(follow);
                }
            }
        }

        Some(transition)
    }

    fn commit(&mut self, transition: Transition) {
        self.remount();
        self.presentation_tx.send_replace(self.controller.presentation());
        let _ = self.event_tx.send(PageEvent::StateChanged {
            unit: self.unit(),
            from: transition.from,
            to: transition.to,
        });
    }

    fn remount(&mut self) {
        let mut backend = self.backend.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = self.mounted.take() {
            backend.unmount(handle);
        }
        if self.controller.is_released() {
            return;
        }

        let presentation = self.controller.presentation();
        match backend.mount(&presentation) {
            Ok(handle) => self.mounted = Some(handle),
            Err(e) => log::warn!(
                "Unit[{}]: {} could not mount {:?}: {e:#}",
                presentation.unit,
                backend.name(),
                presentation.state
            ),
        }
    }
}

/// Arguments required to spawn a unit worker.
pub(crate) struct UnitSpawnArgs {
    pub core: SharedCore,
    /// Latest reduced-motion preference
    pub preference_rx: watch::Receiver<bool>,
    /// Latest scroll progress, for scroll-linked units
    pub scroll_rx: Option<watch::Receiver<f64>>,
    /// In-flight load, for units with assets
    pub load: Option<BoxFuture<'static, LoadSet>>,
    /// Pending viewport observation, for gated units
    pub gate: Option<Observation>,
    pub cancel: CancellationToken,
}

/// Async side of a unit: waits on its load, its viewport gate, preference
/// and scroll updates, and feeds them to the controller one at a time.
pub(crate) struct UnitWorker {
    args: UnitSpawnArgs,
}

impl UnitWorker {
    pub fn new(args: UnitSpawnArgs) -> Self {
        Self { args }
    }

    pub async fn run(self) {
        let UnitSpawnArgs {
            core,
            mut preference_rx,
            mut scroll_rx,
            mut load,
            mut gate,
            cancel,
        } = self.args;
        let unit = lock(&core).unit();
        log::debug!("Unit[{unit}]: worker started");

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                changed = preference_rx.changed() => {
                    if changed.is_err() {
                        // Preference subscription dropped, the unit was unmounted
                        break;
                    }
                    let reduce = *preference_rx.borrow_and_update();
                    lock(&core).dispatch(UnitEvent::PreferenceChanged(reduce));
                }

                // Handle in-flight load completion
                set = async {
                    match load.as_mut() {
                        Some(fut) => fut.await,
                        None => pending().await,
                    }
                } => {
                    load = None;
                    lock(&core).dispatch(UnitEvent::Settled(Arc::new(set)));
                }

                state = async {
                    match gate.as_mut() {
                        Some(observation) => observation.await,
                        None => pending().await,
                    }
                } => {
                    gate = None;
                    match state {
                        GateState::Resolved => {
                            lock(&core).dispatch(UnitEvent::ViewportEntered);
                        }
                        _ => log::debug!("Unit[{unit}]: viewport observation released"),
                    }
                }

                progress = async {
                    match scroll_rx.as_mut() {
                        Some(rx) => match rx.changed().await {
                            Ok(()) => Some(*rx.borrow_and_update()),
                            Err(_) => None,
                        },
                        None => pending().await,
                    }
                } => {
                    match progress {
                        Some(p) => {
                            lock(&core).dispatch(UnitEvent::ScrollProgress(p));
                        }
                        None => scroll_rx = None,
                    }
                }
            }
        }

        log::debug!("Unit[{unit}]: worker stopped");
    }
}
