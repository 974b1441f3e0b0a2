//! Page event types.
//!
//! Every [`Page`](crate::engine::page::Page) has one broadcast bus. Hosts and
//! tests subscribe with [`Page::subscribe_events`](crate::engine::page::Page::subscribe_events).
//!
//! # Main Types
//!
//! - [`PageEvent`]: unit lifecycle and state changes.

use crate::engine::loader::ResourceId;
use crate::engine::unit::{PresentationState, UnitId, UnitKind};
use std::fmt::{Debug, Display};

/// Events emitted by a page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// A unit was mounted and its worker started.
    UnitMounted { unit: UnitId, kind: UnitKind },
    /// A unit's resources settled. Emitted whatever the outcome.
    LoadSettled {
        unit: UnitId,
        succeeded: Vec<ResourceId>,
        failed: Vec<ResourceId>,
    },
    /// A transition was committed.
    StateChanged {
        unit: UnitId,
        from: PresentationState,
        to: PresentationState,
    },
    /// The unit was unmounted. Nothing about it is emitted afterwards.
    UnitReleased { unit: UnitId },
}

impl PageEvent {
    pub fn unit(&self) -> UnitId {
        match self {
            PageEvent::UnitMounted { unit, .. }
            | PageEvent::LoadSettled { unit, .. }
            | PageEvent::StateChanged { unit, .. }
            | PageEvent::UnitReleased { unit } => *unit,
        }
    }
}

impl Display for PageEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageEvent::UnitMounted { unit, kind } => write!(f, "UnitMounted({unit}, {kind})"),
            PageEvent::LoadSettled { unit, succeeded, failed } => {
                write!(f, "LoadSettled({unit}, ok={}, failed={})", succeeded.len(), failed.len())
            }
            PageEvent::StateChanged { unit, from, to } => write!(f, "StateChanged({unit}, {from:?} -> {to:?})"),
            PageEvent::UnitReleased { unit } => write!(f, "UnitReleased({unit})"),
        }
    }
}
