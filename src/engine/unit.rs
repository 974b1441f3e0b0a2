// src/engine/unit.rs
//! Presentable units: [`UnitId`], [`UnitPolicy`] and the per-unit controller.
//!
//! A *presentable unit* is one visual element whose display depends on async
//! resources, viewport visibility, the motion preference, or scroll position.
//! Each kind describes itself with a [`UnitPolicy`]; the
//! [`PresentationController`](controller::PresentationController) drives the
//! state machine in [`state`], the [`worker`] feeds it events, and the
//! [`UnitHandle`](handle::UnitHandle) lets the host observe and unmount it.

use crate::engine::config::{valid_threshold, PageConfig};
use crate::engine::errors::PresentError;
use crate::engine::loader::{Decode, LoadSet, ResourceId};
use crate::engine::viewport::ElementRef;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

pub mod controller;
pub mod handle;
pub mod state;
pub(crate) mod worker;

pub use controller::{Presentation, PresentationController, Transition};
pub use handle::UnitHandle;
pub use state::{Conditions, FallbackReason, PresentationState, UnitEvent};

/// A unique identifier for a mounted unit, represented as a UUID.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(Uuid);

impl UnitId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    ScrollBackground,
    LazyScene,
    VectorAnimation,
    Reveal,
}

impl Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitKind::ScrollBackground => write!(f, "ScrollBackground"),
            UnitKind::LazyScene => write!(f, "LazyScene"),
            UnitKind::VectorAnimation => write!(f, "VectorAnimation"),
            UnitKind::Reveal => write!(f, "Reveal"),
        }
    }
}

bitflags! {
    /// What a unit needs from the engine.
    pub struct Capabilities: u8 {
        /// Loads resources before it can present.
        const ASYNC_ASSETS   = 0b0001;
        /// Heavy content waits until the element is in the viewport.
        const VIEWPORT_GATED = 0b0010;
        /// Variant follows scroll progress.
        const SCROLL_LINKED  = 0b0100;
        /// Needs a backend able to mount heavy content (3D scenes).
        const HEAVY          = 0b1000;
    }
}

/// When a settled load counts as a failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Failed only when nothing succeeded.
    AnySuccess,
    /// Failed as soon as any resource failed.
    AllRequired,
}

impl FailurePolicy {
    pub fn is_failed(self, set: &LoadSet) -> bool {
        match self {
            FailurePolicy::AnySuccess => !set.requested().is_empty() && set.succeeded().is_empty(),
            FailurePolicy::AllRequired => !set.failed().is_empty(),
        }
    }
}

/// Which fallback wins when motion is reduced *and* heavy rendering is unavailable.
///
/// There is intentionally no default: every heavy unit must choose.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPrecedence {
    /// Show the reduced-motion substitute (e.g. a poster image).
    ReducedMotion,
    /// Show the lightweight placeholder.
    RenderUnavailable,
}

/// Everything the controller needs to know about a unit kind.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitPolicy {
    pub kind: UnitKind,
    pub capabilities: Capabilities,
    pub resources: Vec<ResourceId>,
    pub decode: Decode,
    pub failure: FailurePolicy,
    /// Number of scroll-selectable variants (at least 1).
    pub variant_count: usize,
    /// A static substitute exists for reduced motion (poster, first background, plain content).
    pub static_substitute: bool,
    pub element: Option<ElementRef>,
    pub threshold: f32,
    pub precedence: Option<FallbackPrecedence>,
}

impl UnitPolicy {
    pub fn new(kind: UnitKind) -> Self {
        Self {
            kind,
            capabilities: Capabilities::empty(),
            resources: Vec::new(),
            decode: Decode::Raw,
            failure: FailurePolicy::AllRequired,
            variant_count: 1,
            static_substitute: false,
            element: None,
            threshold: crate::engine::config::DEFAULT_THRESHOLD,
            precedence: None,
        }
    }

    pub fn has(&self, caps: Capabilities) -> bool {
        self.capabilities.contains(caps)
    }

    pub fn validate(&self) -> Result<(), PresentError> {
        if self.variant_count == 0 {
            return Err(PresentError::InvalidUnit(format!("{} needs at least one variant", self.kind)));
        }
        if self.has(Capabilities::ASYNC_ASSETS) && self.resources.is_empty() {
            return Err(PresentError::InvalidUnit(format!("{} loads assets but lists none", self.kind)));
        }
        if self.has(Capabilities::VIEWPORT_GATED) {
            if self.element.is_none() {
                return Err(PresentError::InvalidUnit(format!("{} is viewport gated but has no element", self.kind)));
            }
            if !valid_threshold(self.threshold) {
                return Err(PresentError::InvalidUnit(format!(
                    "{} threshold {} is out of range (expected 0 < t <= 1)",
                    self.kind, self.threshold
                )));
            }
        }
        if self.has(Capabilities::HEAVY) && self.precedence.is_none() {
            return Err(PresentError::InvalidUnit(format!("{} must choose a fallback precedence", self.kind)));
        }
        Ok(())
    }
}

/// Adapter implemented by each presentable-unit kind.
pub trait PresentableUnit {
    fn kind(&self) -> UnitKind;

    /// Policy for this unit. `config` supplies page-wide defaults (threshold, base URL).
    fn policy(&self, config: &PageConfig) -> UnitPolicy;
}
