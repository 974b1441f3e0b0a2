use crate::engine::config::PageConfig;
use crate::engine::loader::ResourceId;
use crate::engine::unit::{
    Capabilities, FallbackPrecedence, PresentableUnit, Presentation, PresentationState, UnitKind, UnitPolicy,
};
use crate::engine::viewport::ElementRef;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_POSTER: &str = "/assets/posters/r3f-fallback.jpg";

/// Decorative 3D scene, mounted only once its element scrolls into view.
///
/// `precedence` has no default: a page must decide what a visitor with reduced
/// motion *and* no capable renderer sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LazyScene {
    pub element: ElementRef,
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default)]
    pub poster: Option<ResourceId>,
    pub fallback_precedence: FallbackPrecedence,
}

/// Scene rotation in radians.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Orbit {
    pub rot_x: f64,
    pub rot_y: f64,
}

impl Orbit {
    /// Gentle idle sway after `elapsed` seconds of scene time.
    pub fn at(elapsed: Duration) -> Self {
        let t = elapsed.as_secs_f64();
        Self {
            rot_x: (t * 0.2).cos() * 0.1,
            rot_y: (t * 0.3).sin() * 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneFrame {
    /// Lightweight box with a "loading" hint.
    Placeholder,
    Mount { orbit: Orbit },
    Poster(ResourceId),
    Hidden,
}

impl LazyScene {
    pub fn new(element: impl Into<ElementRef>, precedence: FallbackPrecedence) -> Self {
        Self {
            element: element.into(),
            threshold: None,
            poster: Some(ResourceId::new(DEFAULT_POSTER)),
            fallback_precedence: precedence,
        }
    }

    /// `elapsed` is the time since the scene was mounted.
    pub fn frame(&self, presentation: &Presentation, elapsed: Duration) -> SceneFrame {
        match presentation.state {
            PresentationState::Active { revealed: true, .. } => SceneFrame::Mount { orbit: Orbit::at(elapsed) },
            PresentationState::StaticFallback(_) => match &self.poster {
                Some(poster) => SceneFrame::Poster(poster.clone()),
                None => SceneFrame::Placeholder,
            },
            PresentationState::Released => SceneFrame::Hidden,
            _ => SceneFrame::Placeholder,
        }
    }
}

impl PresentableUnit for LazyScene {
    fn kind(&self) -> UnitKind {
        UnitKind::LazyScene
    }

    fn policy(&self, config: &PageConfig) -> UnitPolicy {
        UnitPolicy {
            capabilities: Capabilities::VIEWPORT_GATED | Capabilities::HEAVY,
            static_substitute: self.poster.is_some(),
            element: Some(self.element.clone()),
            threshold: self.threshold.unwrap_or(config.default_threshold),
            precedence: Some(self.fallback_precedence),
            ..UnitPolicy::new(UnitKind::LazyScene)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::unit::{FallbackReason, UnitId};

    fn presentation(state: PresentationState) -> Presentation {
        Presentation {
            unit: UnitId::new(),
            kind: UnitKind::LazyScene,
            state,
            variant: 0,
            reduce_motion: false,
            load: None,
        }
    }

    #[test]
    fn orbit_starts_level_and_stays_small() {
        let start = Orbit::at(Duration::ZERO);
        assert_eq!(start.rot_y, 0.0);
        assert!((start.rot_x - 0.1).abs() < 1e-12);

        for secs in 0..120 {
            let o = Orbit::at(Duration::from_millis(secs * 250));
            assert!(o.rot_y.abs() <= 0.2 + 1e-12);
            assert!(o.rot_x.abs() <= 0.1 + 1e-12);
        }
    }

    #[test]
    fn heavy_content_waits_for_the_viewport() {
        let scene = LazyScene::new("#orb", FallbackPrecedence::ReducedMotion);
        let waiting = presentation(PresentationState::Active { variant: 0, revealed: false });
        assert_eq!(scene.frame(&waiting, Duration::ZERO), SceneFrame::Placeholder);

        let shown = presentation(PresentationState::Active { variant: 0, revealed: true });
        assert!(matches!(scene.frame(&shown, Duration::from_secs(1)), SceneFrame::Mount { .. }));
    }

    #[test]
    fn reduced_motion_shows_the_poster() {
        let scene = LazyScene::new("#orb", FallbackPrecedence::ReducedMotion);
        let p = presentation(PresentationState::StaticFallback(FallbackReason::ReducedMotion));
        assert_eq!(scene.frame(&p, Duration::ZERO), SceneFrame::Poster(ResourceId::new(DEFAULT_POSTER)));

        let unavailable = presentation(PresentationState::Placeholder(FallbackReason::RenderUnavailable));
        assert_eq!(scene.frame(&unavailable, Duration::ZERO), SceneFrame::Placeholder);
    }

    #[test]
    fn policy_uses_page_threshold_unless_overridden() {
        let cfg = PageConfig::builder().default_threshold(0.25).build().unwrap();
        let mut scene = LazyScene::new("#orb", FallbackPrecedence::RenderUnavailable);
        assert_eq!(scene.policy(&cfg).threshold, 0.25);

        scene.threshold = Some(0.5);
        let policy = scene.policy(&cfg);
        assert_eq!(policy.threshold, 0.5);
        assert_eq!(policy.precedence, Some(FallbackPrecedence::RenderUnavailable));
        assert!(policy.has(Capabilities::HEAVY));
        assert!(policy.validate().is_ok());
    }
}
