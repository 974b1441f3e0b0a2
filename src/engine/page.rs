//! The page: owner of every page-wide service and of the mounted units.
//!
//! A [`Page`] is created once per page load from a [`Platform`] (the host's
//! preference query, scroll geometry, intersection primitive and resource
//! fetcher) and a [`PresentationBackend`]. [`Page::mount`] turns a
//! [`PresentableUnit`] into a running unit: a controller, a worker task on the
//! current tokio runtime, and a [`UnitHandle`] for the host.

use crate::engine::config::{self, PageConfig};
use crate::engine::errors::PresentError;
use crate::engine::events::PageEvent;
use crate::engine::loader::{LoadSet, ResourceFetcher, ResourceLoader};
use crate::engine::preference::{PreferenceMonitor, PreferenceSource};
use crate::engine::scroll::{ScrollGeometry, ScrollMetric};
use crate::engine::unit::handle::Registrations;
use crate::engine::unit::worker::{lock, UnitCore, UnitSpawnArgs, UnitWorker};
use crate::engine::unit::{
    Capabilities, Conditions, PresentableUnit, PresentationController, UnitEvent, UnitHandle, UnitId,
};
use crate::engine::viewport::{IntersectionObserver, ViewportGate};
use crate::render::{PresentationBackend, SharedBackend};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Host collaborators a page is built on.
#[derive(Clone)]
pub struct Platform {
    pub preference: Arc<dyn PreferenceSource>,
    pub geometry: Arc<dyn ScrollGeometry>,
    pub intersection: Arc<dyn IntersectionObserver>,
    pub fetcher: Arc<dyn ResourceFetcher>,
}

pub struct Page {
    config: PageConfig,
    preference: Arc<PreferenceMonitor>,
    scroll: Arc<ScrollMetric>,
    gate: ViewportGate,
    fetcher: Arc<dyn ResourceFetcher>,
    backend: SharedBackend,
    event_tx: broadcast::Sender<PageEvent>,
    /// Number of mounted, not yet released units
    live: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("config", &self.config)
            .field("preference", &self.preference)
            .field("scroll", &self.scroll)
            .field("units", &self.unit_count())
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Create a page. `None` uses [`PageConfig::default`].
    pub fn new(
        config: Option<PageConfig>,
        platform: Platform,
        backend: Box<dyn PresentationBackend>,
    ) -> Result<Self, PresentError> {
        let config = config.unwrap_or_default();
        config::validate(&config)?;

        let preference = PreferenceMonitor::shared(platform.preference.as_ref());
        let scroll = Arc::new(ScrollMetric::new(platform.geometry, config.frame_interval()));
        let (event_tx, _) = broadcast::channel(config.channel_capacity);

        log::info!(
            "page created (backend={}, reduce_motion={})",
            backend.name(),
            preference.current()
        );

        Ok(Self {
            preference,
            scroll,
            gate: ViewportGate::new(platform.intersection),
            fetcher: platform.fetcher,
            backend: Arc::new(Mutex::new(backend)),
            event_tx,
            live: Arc::new(AtomicUsize::new(0)),
            cancel: CancellationToken::new(),
            config,
        })
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    pub fn preference(&self) -> &Arc<PreferenceMonitor> {
        &self.preference
    }

    pub fn scroll(&self) -> &Arc<ScrollMetric> {
        &self.scroll
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PageEvent> {
        self.event_tx.subscribe()
    }

    /// Units mounted and not yet released.
    pub fn unit_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Drive scroll ticks at the configured frame interval until the page is dropped.
    ///
    /// Hosts with their own frame callback can call [`ScrollMetric::tick`] instead.
    pub fn start_frame_loop(&self) -> Result<JoinHandle<()>, PresentError> {
        Handle::try_current().map_err(|_| PresentError::NoRuntime)?;
        Ok(self.scroll.spawn_frame_loop(self.cancel.child_token()))
    }

    /// Mount `unit` and start its worker on the current runtime.
    pub fn mount(&self, unit: &dyn PresentableUnit) -> Result<UnitHandle, PresentError> {
        let runtime = Handle::try_current().map_err(|_| PresentError::NoRuntime)?;

        let kind = unit.kind();
        let policy = Arc::new(unit.policy(&self.config));
        policy.validate()?;
        if policy.kind != kind {
            return Err(PresentError::InvalidUnit(format!("{kind} unit declared a {} policy", policy.kind)));
        }

        let max = self.config.max_units;
        self.live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .map_err(|_| PresentError::UnitLimitExceeded)?;

        let id = UnitId::new();

        // Latest value only: a burst of toggles collapses to the final preference.
        let (preference_tx, mut preference_rx) = watch::channel(false);
        let preference_tx = Arc::new(preference_tx);

        // Subscribe before reading, so no change falls in between.
        let preference = {
            let tx = preference_tx.clone();
            self.preference.subscribe(move |reduce| {
                tx.send_replace(*reduce);
            })
        };
        preference_tx.send_replace(self.preference.current());
        let reduce_motion = *preference_rx.borrow_and_update();
        drop(preference_tx);

        let render_available = {
            let backend = self.backend.lock().unwrap_or_else(|e| e.into_inner());
            backend.supports_heavy()
        };
        let conditions = Conditions {
            reduce_motion,
            render_available,
            viewport_entered: false,
        };

        let scroll_linked = policy.has(Capabilities::SCROLL_LINKED);
        let controller = PresentationController::new(id, policy.clone(), conditions);
        let core = Arc::new(Mutex::new(UnitCore::new(
            controller,
            self.backend.clone(),
            scroll_linked.then(|| self.scroll.clone()),
            self.event_tx.clone(),
        )));

        let _ = self.event_tx.send(PageEvent::UnitMounted { unit: id, kind });
        log::info!("Unit[{id}]: mounting {kind}");

        let load = {
            let mut core = lock(&core);
            core.dispatch(UnitEvent::Mount);
            if policy.has(Capabilities::ASYNC_ASSETS) {
                let loader = ResourceLoader::new(self.fetcher.clone(), policy.decode);
                Some(loader.load(policy.resources.iter().cloned()))
            } else {
                core.dispatch(UnitEvent::Settled(Arc::new(LoadSet::empty())));
                None
            }
        };

        let (scroll, scroll_rx) = if scroll_linked {
            let (tx, rx) = watch::channel(self.scroll.current_progress());
            let sub = self.scroll.subscribe(move |progress| {
                tx.send_replace(*progress);
            });
            (Some(sub), Some(rx))
        } else {
            (None, None)
        };

        let gate = match (&policy.element, policy.has(Capabilities::VIEWPORT_GATED)) {
            (Some(element), true) => Some(self.gate.observe(element, policy.threshold)),
            _ => None,
        };

        let cancel = self.cancel.child_token();
        let registrations = Registrations {
            _preference: preference,
            _scroll: scroll,
            gate: gate.as_ref().map(|g| g.canceller()),
        };

        let worker = UnitWorker::new(UnitSpawnArgs {
            core: core.clone(),
            preference_rx,
            scroll_rx,
            load,
            gate,
            cancel: cancel.clone(),
        });
        runtime.spawn(worker.run());

        Ok(UnitHandle::new(
            id,
            kind,
            core,
            registrations,
            cancel,
            self.event_tx.clone(),
            self.live.clone(),
        ))
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
