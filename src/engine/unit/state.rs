//! The presentation state machine.
//!
//! [`transition`] is a pure function of the unit's policy, the current
//! [`Conditions`], the current state and one [`UnitEvent`]. It returns the next
//! state, or `None` when the event does not apply. The controller is the only
//! caller that commits the result.

use super::{Capabilities, FallbackPrecedence, UnitPolicy};
use crate::engine::loader::LoadSet;
use serde::Serialize;
use std::sync::Arc;

/// Why a unit is not showing its full, animated content.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Loading did not produce enough resources.
    LoadFailed,
    /// The user prefers reduced motion.
    ReducedMotion,
    /// The backend cannot mount heavy content.
    RenderUnavailable,
    /// Motion was reduced while the unit was already active.
    Downgraded,
}

/// Current state of a unit.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationState {
    /// Created, not mounted yet.
    #[default]
    Idle,

    /// Mounted, resources are being fetched. A placeholder is visible.
    Loading,

    /// Lightweight stand-in. Upgrades to [`PresentationState::Active`] only
    /// when the reason is [`FallbackReason::ReducedMotion`] and motion is allowed again.
    Placeholder(FallbackReason),

    /// Full content. `variant` is the scroll-selected variant, `revealed` is
    /// false while a viewport-gated unit is still waiting for its element.
    Active { variant: usize, revealed: bool },

    /// Static substitute (poster, first background, unanimated content).
    StaticFallback(FallbackReason),

    /// Unmounted. Terminal: every later event is discarded.
    Released,
}

impl PresentationState {
    pub fn is_active(&self) -> bool {
        matches!(self, PresentationState::Active { .. })
    }

    pub fn is_released(&self) -> bool {
        matches!(self, PresentationState::Released)
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self {
            PresentationState::Placeholder(r) | PresentationState::StaticFallback(r) => Some(*r),
            _ => None,
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitEvent {
    Mount,
    /// The unit's load set settled (successes and failures both recorded).
    Settled(Arc<LoadSet>),
    /// The reduced-motion preference is now `true` or `false`.
    PreferenceChanged(bool),
    /// The gated element crossed its threshold.
    ViewportEntered,
    /// Normalised scroll progress in `[0, 1]`.
    ScrollProgress(f64),
    Unmount,
}

/// Environment the state machine decides against.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Conditions {
    pub reduce_motion: bool,
    pub render_available: bool,
    pub viewport_entered: bool,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            reduce_motion: false,
            render_available: true,
            viewport_entered: false,
        }
    }
}

/// Index of the variant selected by `progress` among `count` variants.
///
/// `floor(progress * (count - 1))`, clamped to `[0, count - 1]`.
pub fn variant_index(progress: f64, count: usize) -> usize {
    if count <= 1 || progress.is_nan() {
        return 0;
    }
    let last = count - 1;
    let idx = (progress.clamp(0.0, 1.0) * last as f64).floor() as usize;
    idx.min(last)
}

/// Next state for `event`, or `None` when the event is ignored in `state`.
///
/// `conditions` must already reflect the event (a preference change or a
/// viewport entry is applied before calling).
pub fn transition(
    policy: &UnitPolicy,
    conditions: &Conditions,
    state: PresentationState,
    event: &UnitEvent,
) -> Option<PresentationState> {
    use PresentationState::*;

    match (state, event) {
        (Released, _) => None,
        (_, UnitEvent::Unmount) => Some(Released),

        // Units without assets settle right away on an empty set.
        (Idle, UnitEvent::Mount) => Some(Loading),

        (Loading, UnitEvent::Settled(set)) if set.is_settled() => {
            if policy.failure.is_failed(set) {
                Some(StaticFallback(FallbackReason::LoadFailed))
            } else {
                Some(ready(policy, conditions))
            }
        }

        (Active { variant, revealed: false }, UnitEvent::ViewportEntered) => Some(Active { variant, revealed: true }),

        (Active { .. }, UnitEvent::PreferenceChanged(true)) => Some(reduced(policy, FallbackReason::Downgraded)),

        (Active { variant, revealed }, UnitEvent::ScrollProgress(p)) if policy.has(Capabilities::SCROLL_LINKED) => {
            let next = variant_index(*p, policy.variant_count);
            (next != variant).then_some(Active { variant: next, revealed })
        }

        (Placeholder(FallbackReason::ReducedMotion) | StaticFallback(FallbackReason::ReducedMotion), UnitEvent::PreferenceChanged(false)) => {
            Some(ready(policy, conditions))
        }

        (Placeholder(FallbackReason::RenderUnavailable), UnitEvent::PreferenceChanged(true))
            if policy.precedence == Some(FallbackPrecedence::ReducedMotion) =>
        {
            Some(reduced(policy, FallbackReason::ReducedMotion))
        }

        _ => None,
    }
}

/// State for a unit whose resources are available.
fn ready(policy: &UnitPolicy, conditions: &Conditions) -> PresentationState {
    let unavailable = policy.has(Capabilities::HEAVY) && !conditions.render_available;

    match (conditions.reduce_motion, unavailable) {
        (false, false) => PresentationState::Active {
            variant: 0,
            revealed: !policy.has(Capabilities::VIEWPORT_GATED) || conditions.viewport_entered,
        },
        (true, false) => reduced(policy, FallbackReason::ReducedMotion),
        (false, true) => PresentationState::Placeholder(FallbackReason::RenderUnavailable),
        (true, true) => match policy.precedence {
            Some(FallbackPrecedence::ReducedMotion) => reduced(policy, FallbackReason::ReducedMotion),
            _ => PresentationState::Placeholder(FallbackReason::RenderUnavailable),
        },
    }
}

fn reduced(policy: &UnitPolicy, reason: FallbackReason) -> PresentationState {
    if policy.static_substitute {
        PresentationState::StaticFallback(reason)
    } else {
        PresentationState::Placeholder(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::errors::ResourceFetchFailure;
    use crate::engine::loader::{Payload, ResourceId};
    use crate::engine::unit::{FailurePolicy, UnitKind};
    use crate::engine::viewport::ElementRef;
    use PresentationState::*;

    fn backgrounds(n: usize) -> UnitPolicy {
        let mut p = UnitPolicy::new(UnitKind::ScrollBackground);
        p.capabilities = Capabilities::ASYNC_ASSETS | Capabilities::SCROLL_LINKED;
        p.resources = (0..n).map(|i| ResourceId::new(format!("/bg-{i}.jpg"))).collect();
        p.failure = FailurePolicy::AnySuccess;
        p.variant_count = n;
        p.static_substitute = true;
        p
    }

    fn scene(precedence: FallbackPrecedence) -> UnitPolicy {
        let mut p = UnitPolicy::new(UnitKind::LazyScene);
        p.capabilities = Capabilities::VIEWPORT_GATED | Capabilities::HEAVY;
        p.element = Some(ElementRef::from("#scene"));
        p.static_substitute = true;
        p.precedence = Some(precedence);
        p
    }

    fn settled(requested: &[&str], ok: &[&str]) -> UnitEvent {
        let mut set = LoadSet::new(requested.iter().map(|s| ResourceId::new(*s)));
        for id in requested {
            if ok.contains(id) {
                set.record_success(ResourceId::new(*id), Payload::Bytes(vec![]));
            } else {
                set.record_failure(ResourceId::new(*id), ResourceFetchFailure::NotFound(id.to_string()));
            }
        }
        UnitEvent::Settled(Arc::new(set))
    }

    #[test]
    fn variant_index_follows_progress() {
        assert_eq!(variant_index(0.0, 4), 0);
        assert_eq!(variant_index(0.5, 4), 1);
        assert_eq!(variant_index(0.99, 4), 2);
        assert_eq!(variant_index(1.0, 4), 3);
        assert_eq!(variant_index(7.0, 4), 3);
        assert_eq!(variant_index(-1.0, 4), 0);
        assert_eq!(variant_index(f64::NAN, 4), 0);
        assert_eq!(variant_index(0.8, 1), 0);
    }

    #[test]
    fn mount_goes_to_loading() {
        let p = backgrounds(2);
        assert_eq!(transition(&p, &Conditions::default(), Idle, &UnitEvent::Mount), Some(Loading));
    }

    #[test]
    fn empty_settlement_waits_for_the_viewport() {
        let mut p = UnitPolicy::new(UnitKind::Reveal);
        p.capabilities = Capabilities::VIEWPORT_GATED;
        p.element = Some(ElementRef::from("#r"));
        p.static_substitute = true;
        let empty = UnitEvent::Settled(Arc::new(LoadSet::empty()));

        assert_eq!(
            transition(&p, &Conditions::default(), Loading, &empty),
            Some(Active { variant: 0, revealed: false })
        );

        let entered = Conditions { viewport_entered: true, ..Default::default() };
        assert_eq!(
            transition(&p, &entered, Loading, &empty),
            Some(Active { variant: 0, revealed: true })
        );

        let reduced = Conditions { reduce_motion: true, ..Default::default() };
        assert_eq!(
            transition(&p, &reduced, Loading, &empty),
            Some(StaticFallback(FallbackReason::ReducedMotion))
        );
    }

    #[test]
    fn any_success_activates() {
        let p = backgrounds(2);
        let next = transition(&p, &Conditions::default(), Loading, &settled(&["/bg-0.jpg", "/bg-1.jpg"], &["/bg-1.jpg"]));
        assert_eq!(next, Some(Active { variant: 0, revealed: true }));
    }

    #[test]
    fn total_failure_falls_back_and_stays_there() {
        let p = backgrounds(2);
        let event = settled(&["/bg-0.jpg", "/bg-1.jpg"], &[]);
        let next = transition(&p, &Conditions::default(), Loading, &event);
        assert_eq!(next, Some(StaticFallback(FallbackReason::LoadFailed)));

        let fallback = StaticFallback(FallbackReason::LoadFailed);
        assert_eq!(transition(&p, &Conditions::default(), fallback, &event), None);
        assert_eq!(transition(&p, &Conditions::default(), fallback, &UnitEvent::PreferenceChanged(false)), None);
        assert_eq!(transition(&p, &Conditions::default(), fallback, &UnitEvent::ScrollProgress(1.0)), None);
    }

    #[test]
    fn all_required_fails_on_a_single_failure() {
        let mut p = backgrounds(2);
        p.failure = FailurePolicy::AllRequired;
        let next = transition(&p, &Conditions::default(), Loading, &settled(&["/bg-0.jpg", "/bg-1.jpg"], &["/bg-0.jpg"]));
        assert_eq!(next, Some(StaticFallback(FallbackReason::LoadFailed)));
    }

    #[test]
    fn settle_under_reduced_motion_uses_the_substitute() {
        let p = backgrounds(2);
        let cond = Conditions { reduce_motion: true, ..Default::default() };
        let next = transition(&p, &cond, Loading, &settled(&["/bg-0.jpg", "/bg-1.jpg"], &["/bg-0.jpg", "/bg-1.jpg"]));
        assert_eq!(next, Some(StaticFallback(FallbackReason::ReducedMotion)));
    }

    #[test]
    fn scroll_changes_variant_only_when_it_moves() {
        let p = backgrounds(4);
        let cond = Conditions::default();
        let active = Active { variant: 0, revealed: true };

        assert_eq!(transition(&p, &cond, active, &UnitEvent::ScrollProgress(0.1)), None);
        assert_eq!(
            transition(&p, &cond, active, &UnitEvent::ScrollProgress(1.0)),
            Some(Active { variant: 3, revealed: true })
        );
    }

    #[test]
    fn scroll_is_ignored_by_units_that_are_not_scroll_linked() {
        let p = scene(FallbackPrecedence::ReducedMotion);
        let active = Active { variant: 0, revealed: true };
        assert_eq!(transition(&p, &Conditions::default(), active, &UnitEvent::ScrollProgress(1.0)), None);
    }

    #[test]
    fn reduced_motion_downgrades_and_never_upgrades_from_downgraded() {
        let p = backgrounds(2);
        let cond = Conditions { reduce_motion: true, ..Default::default() };
        let next = transition(&p, &cond, Active { variant: 1, revealed: true }, &UnitEvent::PreferenceChanged(true));
        assert_eq!(next, Some(StaticFallback(FallbackReason::Downgraded)));

        let cond = Conditions::default();
        assert_eq!(
            transition(&p, &cond, StaticFallback(FallbackReason::Downgraded), &UnitEvent::PreferenceChanged(false)),
            None
        );
    }

    #[test]
    fn reduced_motion_fallback_upgrades_when_motion_is_allowed() {
        let p = backgrounds(2);
        let next = transition(
            &p,
            &Conditions::default(),
            StaticFallback(FallbackReason::ReducedMotion),
            &UnitEvent::PreferenceChanged(false),
        );
        assert_eq!(next, Some(Active { variant: 0, revealed: true }));
    }

    #[test]
    fn viewport_entry_reveals_once() {
        let p = scene(FallbackPrecedence::ReducedMotion);
        let cond = Conditions { viewport_entered: true, ..Default::default() };
        let hidden = Active { variant: 0, revealed: false };
        let shown = Active { variant: 0, revealed: true };

        assert_eq!(transition(&p, &cond, hidden, &UnitEvent::ViewportEntered), Some(shown));
        assert_eq!(transition(&p, &cond, shown, &UnitEvent::ViewportEntered), None);
    }

    #[test]
    fn precedence_decides_between_reduced_motion_and_missing_renderer() {
        let both = Conditions {
            reduce_motion: true,
            render_available: false,
            viewport_entered: false,
        };

        let empty = UnitEvent::Settled(Arc::new(LoadSet::empty()));

        let p = scene(FallbackPrecedence::ReducedMotion);
        assert_eq!(
            transition(&p, &both, Loading, &empty),
            Some(StaticFallback(FallbackReason::ReducedMotion))
        );

        let p = scene(FallbackPrecedence::RenderUnavailable);
        assert_eq!(
            transition(&p, &both, Loading, &empty),
            Some(Placeholder(FallbackReason::RenderUnavailable))
        );
    }

    #[test]
    fn render_unavailable_switches_to_poster_when_reduced_motion_wins() {
        let p = scene(FallbackPrecedence::ReducedMotion);
        let cond = Conditions {
            reduce_motion: true,
            render_available: false,
            viewport_entered: false,
        };
        assert_eq!(
            transition(&p, &cond, Placeholder(FallbackReason::RenderUnavailable), &UnitEvent::PreferenceChanged(true)),
            Some(StaticFallback(FallbackReason::ReducedMotion))
        );

        // Back to motion: the renderer is still missing.
        let cond = Conditions { reduce_motion: false, ..cond };
        assert_eq!(
            transition(&p, &cond, StaticFallback(FallbackReason::ReducedMotion), &UnitEvent::PreferenceChanged(false)),
            Some(Placeholder(FallbackReason::RenderUnavailable))
        );
    }

    #[test]
    fn released_is_terminal() {
        let p = backgrounds(2);
        let cond = Conditions::default();
        assert_eq!(transition(&p, &cond, Loading, &UnitEvent::Unmount), Some(Released));
        for event in [
            UnitEvent::Mount,
            UnitEvent::ViewportEntered,
            UnitEvent::PreferenceChanged(true),
            UnitEvent::ScrollProgress(0.5),
            UnitEvent::Unmount,
            settled(&["/bg-0.jpg"], &["/bg-0.jpg"]),
        ] {
            assert_eq!(transition(&p, &cond, Released, &event), None);
        }
    }

    #[test]
    fn unsettled_load_is_ignored() {
        let p = backgrounds(2);
        let partial = UnitEvent::Settled(Arc::new(LoadSet::new([ResourceId::new("/bg-0.jpg")])));
        assert_eq!(transition(&p, &Conditions::default(), Loading, &partial), None);
    }
}
