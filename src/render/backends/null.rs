use crate::engine::unit::{Presentation, PresentationState, UnitId};
use crate::render::backend::{MountHandle, PresentationBackend};
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// One call received by a [`NullBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NullOp {
    Mount(UnitId, PresentationState),
    Unmount(UnitId),
}

#[derive(Debug, Default)]
struct NullState {
    next_id: u64,
    live: BTreeMap<MountHandle, Presentation>,
    log: Vec<NullOp>,
    failing: bool,
}

/// Null backend that draws nothing. It records what would have been mounted,
/// which is all tests and headless hosts need.
///
/// Clones share the same record, so a test can keep one and hand another to the page.
#[derive(Debug, Clone)]
pub struct NullBackend {
    state: Arc<Mutex<NullState>>,
    heavy: bool,
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            heavy: true,
        }
    }

    /// A backend that cannot mount heavy content.
    pub fn without_heavy() -> Self {
        Self { heavy: false, ..Self::new() }
    }

    /// Make every following mount fail.
    pub fn fail_mounts(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Currently mounted presentations.
    pub fn live(&self) -> Vec<Presentation> {
        self.lock().live.values().cloned().collect()
    }

    pub fn live_for(&self, unit: UnitId) -> Option<Presentation> {
        self.lock().live.values().find(|p| p.unit == unit).cloned()
    }

    pub fn log(&self) -> Vec<NullOp> {
        self.lock().log.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NullState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PresentationBackend for NullBackend {
    fn name(&self) -> &str {
        "NullBackend"
    }

    fn supports_heavy(&self) -> bool {
        self.heavy
    }

    fn mount(&mut self, presentation: &Presentation) -> Result<MountHandle> {
        let mut s = self.lock();
        if s.failing {
            return Err(anyhow!("NullBackend refused to mount {}", presentation.unit));
        }

        s.next_id += 1;
        let handle = MountHandle {
            unit: presentation.unit,
            id: s.next_id,
        };
        s.live.insert(handle, presentation.clone());
        s.log.push(NullOp::Mount(presentation.unit, presentation.state));
        Ok(handle)
    }

    fn unmount(&mut self, handle: MountHandle) {
        let mut s = self.lock();
        if s.live.remove(&handle).is_some() {
            s.log.push(NullOp::Unmount(handle.unit));
        }
    }
}
