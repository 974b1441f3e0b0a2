//! The presentable-unit kinds used on the site.
//!
//! Each kind is a thin adapter over the engine: it declares a
//! [`UnitPolicy`](crate::engine::unit::UnitPolicy) through
//! [`PresentableUnit`](crate::engine::unit::PresentableUnit) and turns a
//! [`Presentation`](crate::engine::unit::Presentation) into the parameters its
//! backend draws with.
//!
//! | Kind | Capabilities | Failure policy |
//! |---|---|---|
//! | [`ScrollBackground`] | assets, scroll-linked | any success |
//! | [`LazyScene`] | viewport-gated, heavy | (no assets) |
//! | [`VectorAnimation`] | assets when remote | all required |
//! | [`Reveal`] | viewport-gated | (no assets) |

pub mod animation;
pub mod background;
pub mod declaration;
pub mod reveal;
pub mod scene;

pub use animation::{AnimationFrame, AnimationSource, VectorAnimation};
pub use background::{Attachment, BackgroundFrame, ScrollBackground};
pub use declaration::UnitSpec;
pub use reveal::{CubicBezier, Direction, Reveal, RevealFrame};
pub use scene::{LazyScene, Orbit, SceneFrame};
