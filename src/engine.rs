//! The presentation engine.
//!
//! Leaves first:
//!
//! - [`preference`]: reduced-motion preference, read once and then pushed by the platform.
//! - [`viewport`]: one-shot viewport gate on top of the platform intersection primitive.
//! - [`loader`]: concurrent resource loading into a [`LoadSet`](loader::LoadSet).
//! - [`scroll`]: throttled, page-wide scroll progress.
//! - [`unit`]: the per-unit state machine, its worker and the host handle.
//! - [`page`]: owns the services above and mounts units.
//! - [`kinds`]: the unit kinds (backgrounds, 3D scene, vector animation, reveal).

pub mod config;
pub mod errors;
pub mod events;
pub mod kinds;
pub mod loader;
pub mod page;
pub mod preference;
pub mod scroll;
pub mod subscription;
pub mod unit;
pub mod viewport;

pub use config::{ConfigError, PageConfig};
pub use errors::{PlatformQueryUnavailable, PresentError, ResourceFetchFailure};
pub use events::PageEvent;
pub use page::{Page, Platform};
pub use unit::{PresentableUnit, Presentation, PresentationState, UnitHandle, UnitId, UnitKind};

/// Default capacity of the page event bus and of each unit's event queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;
