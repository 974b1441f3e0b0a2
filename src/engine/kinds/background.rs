use crate::engine::config::PageConfig;
use crate::engine::loader::ResourceId;
use crate::engine::unit::{
    Capabilities, FailurePolicy, FallbackReason, PresentableUnit, Presentation, PresentationState, UnitKind,
    UnitPolicy,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backgrounds shown behind the site's hero and section blocks, top to bottom.
pub const SITE_BACKGROUNDS: [&str; 4] = [
    "/assets/images/backgrounds/hero-1.jpg",
    "/assets/images/backgrounds/hero-2.jpg",
    "/assets/images/backgrounds/section-1.jpg",
    "/assets/images/backgrounds/section-2.jpg",
];

/// Full-page background that steps through its variants as the page scrolls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollBackground {
    pub variants: Vec<ResourceId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// Stays put while content scrolls over it
    Fixed,
    Scroll,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundFrame {
    /// Plain page background, no image.
    Blank,
    Image {
        source: ResourceId,
        crossfade: Duration,
        attachment: Attachment,
    },
}

impl ScrollBackground {
    pub fn new(variants: impl IntoIterator<Item = ResourceId>) -> Self {
        Self {
            variants: variants.into_iter().collect(),
        }
    }

    pub fn site() -> Self {
        Self::new(SITE_BACKGROUNDS.iter().map(|s| ResourceId::new(*s)))
    }

    pub fn frame(&self, presentation: &Presentation, config: &PageConfig) -> BackgroundFrame {
        match presentation.state {
            PresentationState::Active { variant, .. } => match self.pick(variant, presentation) {
                Some(source) => BackgroundFrame::Image {
                    source,
                    crossfade: config.crossfade(),
                    attachment: Attachment::Fixed,
                },
                None => BackgroundFrame::Blank,
            },
            // Frozen on whatever was showing when motion got reduced.
            PresentationState::StaticFallback(FallbackReason::Downgraded) => {
                self.still(self.pick(presentation.variant, presentation))
            }
            PresentationState::StaticFallback(FallbackReason::ReducedMotion) => self.still(self.pick(0, presentation)),
            _ => BackgroundFrame::Blank,
        }
    }

    fn still(&self, source: Option<ResourceId>) -> BackgroundFrame {
        match source {
            Some(source) => BackgroundFrame::Image {
                source,
                crossfade: Duration::ZERO,
                attachment: Attachment::Scroll,
            },
            None => BackgroundFrame::Blank,
        }
    }

    /// Variant `index`, or the first variant that loaded when that one failed.
    fn pick(&self, index: usize, presentation: &Presentation) -> Option<ResourceId> {
        let wanted = self.variants.get(index)?;
        let Some(load) = &presentation.load else {
            return Some(wanted.clone());
        };

        if load.succeeded().contains(wanted) {
            return Some(wanted.clone());
        }
        self.variants.iter().find(|v| load.succeeded().contains(*v)).cloned()
    }
}

impl PresentableUnit for ScrollBackground {
    fn kind(&self) -> UnitKind {
        UnitKind::ScrollBackground
    }

    fn policy(&self, _config: &PageConfig) -> UnitPolicy {
        UnitPolicy {
            capabilities: Capabilities::ASYNC_ASSETS | Capabilities::SCROLL_LINKED,
            resources: self.variants.clone(),
            failure: FailurePolicy::AnySuccess,
            variant_count: self.variants.len(),
            static_substitute: true,
            ..UnitPolicy::new(UnitKind::ScrollBackground)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::errors::ResourceFetchFailure;
    use crate::engine::loader::{LoadSet, Payload};
    use crate::engine::unit::UnitId;
    use std::sync::Arc;

    fn presentation(state: PresentationState, variant: usize, ok: &[usize]) -> Presentation {
        let bg = ScrollBackground::site();
        let mut load = LoadSet::new(bg.variants.iter().cloned());
        for (i, id) in bg.variants.iter().enumerate() {
            if ok.contains(&i) {
                load.record_success(id.clone(), Payload::Bytes(vec![]));
            } else {
                load.record_failure(id.clone(), ResourceFetchFailure::NotFound(id.to_string()));
            }
        }
        Presentation {
            unit: UnitId::new(),
            kind: UnitKind::ScrollBackground,
            state,
            variant,
            reduce_motion: false,
            load: Some(Arc::new(load)),
        }
    }

    #[test]
    fn policy_tolerates_partial_failure() {
        let policy = ScrollBackground::site().policy(&PageConfig::default());
        assert_eq!(policy.failure, FailurePolicy::AnySuccess);
        assert_eq!(policy.variant_count, 4);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn empty_variant_list_is_invalid() {
        let policy = ScrollBackground::new([]).policy(&PageConfig::default());
        assert!(policy.validate().is_err());
    }

    #[test]
    fn active_frame_crossfades_on_a_fixed_layer() {
        let bg = ScrollBackground::site();
        let p = presentation(PresentationState::Active { variant: 2, revealed: true }, 2, &[0, 1, 2, 3]);
        assert_eq!(
            bg.frame(&p, &PageConfig::default()),
            BackgroundFrame::Image {
                source: ResourceId::new(SITE_BACKGROUNDS[2]),
                crossfade: Duration::from_millis(500),
                attachment: Attachment::Fixed,
            }
        );
    }

    #[test]
    fn failed_variant_falls_back_to_first_loaded_one() {
        let bg = ScrollBackground::site();
        let p = presentation(PresentationState::Active { variant: 0, revealed: true }, 0, &[2, 3]);
        match bg.frame(&p, &PageConfig::default()) {
            BackgroundFrame::Image { source, .. } => assert_eq!(source, ResourceId::new(SITE_BACKGROUNDS[2])),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn reduced_motion_shows_a_still_image() {
        let bg = ScrollBackground::site();
        let cfg = PageConfig::default();

        let never_active = presentation(PresentationState::StaticFallback(FallbackReason::ReducedMotion), 0, &[0, 1, 2, 3]);
        assert_eq!(
            bg.frame(&never_active, &cfg),
            BackgroundFrame::Image {
                source: ResourceId::new(SITE_BACKGROUNDS[0]),
                crossfade: Duration::ZERO,
                attachment: Attachment::Scroll,
            }
        );

        let frozen = presentation(PresentationState::StaticFallback(FallbackReason::Downgraded), 3, &[0, 1, 2, 3]);
        match bg.frame(&frozen, &cfg) {
            BackgroundFrame::Image { source, .. } => assert_eq!(source, ResourceId::new(SITE_BACKGROUNDS[3])),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn nothing_is_drawn_while_loading_or_after_total_failure() {
        let bg = ScrollBackground::site();
        let cfg = PageConfig::default();
        assert_eq!(bg.frame(&presentation(PresentationState::Loading, 0, &[]), &cfg), BackgroundFrame::Blank);
        assert_eq!(
            bg.frame(&presentation(PresentationState::StaticFallback(FallbackReason::LoadFailed), 0, &[]), &cfg),
            BackgroundFrame::Blank
        );
    }
}
