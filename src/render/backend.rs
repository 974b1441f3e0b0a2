use crate::engine::unit::{Presentation, UnitId};
use std::sync::{Arc, Mutex};

/// Token for one mounted presentation. Returned by [`PresentationBackend::mount`]
/// and handed back to [`PresentationBackend::unmount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MountHandle {
    pub unit: UnitId,
    pub id: u64,
}

/// What actually puts pixels on the page: an image layer, a 3D renderer, a
/// vector-animation player. The engine treats it as an opaque mount/unmount
/// target and remounts on every state change.
///
/// Calls are serialized by the engine; implementations need not be reentrant.
pub trait PresentationBackend: Send {
    fn name(&self) -> &str;

    /// Whether heavy content (3D scenes) can be mounted at all.
    fn supports_heavy(&self) -> bool {
        true
    }

    /// Mount `presentation`. Errors are logged by the engine and the unit keeps its state.
    fn mount(&mut self, presentation: &Presentation) -> anyhow::Result<MountHandle>;

    fn unmount(&mut self, handle: MountHandle);
}

/// Backend shared by every unit of a page.
pub type SharedBackend = Arc<Mutex<Box<dyn PresentationBackend>>>;
