use super::state::{transition, Conditions, PresentationState, UnitEvent};
use super::{UnitId, UnitKind, UnitPolicy};
use crate::engine::loader::LoadSet;
use std::sync::Arc;

/// A committed state change.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: PresentationState,
    pub to: PresentationState,
}

/// What the host and the backend see of a unit at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Presentation {
    pub unit: UnitId,
    pub kind: UnitKind,
    pub state: PresentationState,
    /// Last selected variant. Kept while in a fallback so a static substitute
    /// can show the variant the user last saw.
    pub variant: usize,
    pub reduce_motion: bool,
    /// The settled load set, once there is one.
    pub load: Option<Arc<LoadSet>>,
}

impl Presentation {
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

/// Owns one unit's state and commits transitions in arrival order.
///
/// The controller is synchronous; the unit worker feeds it events one at a time.
#[derive(Debug)]
pub struct PresentationController {
    unit: UnitId,
    policy: Arc<UnitPolicy>,
    state: PresentationState,
    conditions: Conditions,
    load: Option<Arc<LoadSet>>,
    variant: usize,
}

impl PresentationController {
    pub fn new(unit: UnitId, policy: Arc<UnitPolicy>, conditions: Conditions) -> Self {
        Self {
            unit,
            policy,
            state: PresentationState::Idle,
            conditions,
            load: None,
            variant: 0,
        }
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn policy(&self) -> &Arc<UnitPolicy> {
        &self.policy
    }

    pub fn state(&self) -> PresentationState {
        self.state
    }

    pub fn conditions(&self) -> Conditions {
        self.conditions
    }

    pub fn is_released(&self) -> bool {
        self.state.is_released()
    }

    /// Applies `event`. Returns the committed transition, if any.
    pub fn handle(&mut self, event: &UnitEvent) -> Option<Transition> {
        if self.is_released() {
            log::trace!("Unit[{}]: discarding {:?} after release", self.unit, event);
            return None;
        }

        match event {
            UnitEvent::PreferenceChanged(reduce) => self.conditions.reduce_motion = *reduce,
            UnitEvent::ViewportEntered => self.conditions.viewport_entered = true,
            _ => {}
        }

        let next = transition(&self.policy, &self.conditions, self.state, event)?;

        match (next, event) {
            (_, UnitEvent::Settled(set)) => self.load = Some(set.clone()),
            (PresentationState::Released, _) => self.load = None,
            _ => {}
        }
        if let PresentationState::Active { variant, .. } = next {
            self.variant = variant;
        }

        let from = std::mem::replace(&mut self.state, next);
        log::debug!("Unit[{}]: {:?} -> {:?}", self.unit, from, next);
        Some(Transition { from, to: next })
    }

    pub fn presentation(&self) -> Presentation {
        Presentation {
            unit: self.unit,
            kind: self.policy.kind,
            state: self.state,
            variant: self.variant,
            reduce_motion: self.conditions.reduce_motion,
            load: self.load.clone(),
        }
    }
}
