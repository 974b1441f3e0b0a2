use crate::engine::config::PageConfig;
use crate::engine::loader::{Decode, ResourceId};
use crate::engine::unit::{
    Capabilities, FailurePolicy, PresentableUnit, Presentation, PresentationState, UnitKind, UnitPolicy,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where the animation document comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnimationSource {
    /// Fetched and parsed as JSON at mount.
    Remote(ResourceId),
    /// Already in hand.
    Inline(Value),
}

fn yes() -> bool {
    true
}

/// Looping vector animation (a Lottie-style JSON document).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorAnimation {
    pub source: AnimationSource,
    #[serde(default)]
    pub poster: Option<ResourceId>,
    #[serde(default = "yes")]
    pub looping: bool,
    #[serde(default = "yes")]
    pub autoplay: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnimationFrame {
    /// Placeholder box with a "Loading..." hint.
    Loading,
    Play { data: Value, looping: bool, autoplay: bool },
    Poster(ResourceId),
    Hidden,
}

impl VectorAnimation {
    pub fn remote(id: impl Into<ResourceId>) -> Self {
        Self::new(AnimationSource::Remote(id.into()))
    }

    pub fn inline(data: Value) -> Self {
        Self::new(AnimationSource::Inline(data))
    }

    fn new(source: AnimationSource) -> Self {
        Self {
            source,
            poster: None,
            looping: true,
            autoplay: true,
        }
    }

    pub fn with_poster(mut self, poster: impl Into<ResourceId>) -> Self {
        self.poster = Some(poster.into());
        self
    }

    pub fn frame(&self, presentation: &Presentation) -> AnimationFrame {
        match presentation.state {
            PresentationState::Idle | PresentationState::Loading => AnimationFrame::Loading,
            PresentationState::Active { .. } => match self.data(presentation) {
                Some(data) => AnimationFrame::Play {
                    data,
                    looping: self.looping,
                    autoplay: self.autoplay,
                },
                None => AnimationFrame::Hidden,
            },
            PresentationState::Placeholder(_) | PresentationState::StaticFallback(_) => match &self.poster {
                Some(poster) => AnimationFrame::Poster(poster.clone()),
                None => AnimationFrame::Hidden,
            },
            PresentationState::Released => AnimationFrame::Hidden,
        }
    }

    fn data(&self, presentation: &Presentation) -> Option<Value> {
        match &self.source {
            AnimationSource::Inline(data) => Some(data.clone()),
            AnimationSource::Remote(id) => presentation
                .load
                .as_ref()?
                .payload(id)?
                .as_json()
                .cloned(),
        }
    }
}

impl PresentableUnit for VectorAnimation {
    fn kind(&self) -> UnitKind {
        UnitKind::VectorAnimation
    }

    fn policy(&self, _config: &PageConfig) -> UnitPolicy {
        let base = UnitPolicy {
            static_substitute: self.poster.is_some(),
            failure: FailurePolicy::AllRequired,
            ..UnitPolicy::new(UnitKind::VectorAnimation)
        };

        match &self.source {
            AnimationSource::Remote(id) => UnitPolicy {
                capabilities: Capabilities::ASYNC_ASSETS,
                resources: vec![id.clone()],
                decode: Decode::Json,
                ..base
            },
            AnimationSource::Inline(_) => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::errors::ResourceFetchFailure;
    use crate::engine::loader::{LoadSet, Payload};
    use crate::engine::unit::{FallbackReason, UnitId};
    use serde_json::json;
    use std::sync::Arc;

    fn presentation(state: PresentationState, load: Option<LoadSet>) -> Presentation {
        Presentation {
            unit: UnitId::new(),
            kind: UnitKind::VectorAnimation,
            state,
            variant: 0,
            reduce_motion: false,
            load: load.map(Arc::new),
        }
    }

    #[test]
    fn remote_sources_load_json_and_require_it() {
        let policy = VectorAnimation::remote("https://cdn.test/loop.json").policy(&PageConfig::default());
        assert!(policy.has(Capabilities::ASYNC_ASSETS));
        assert_eq!(policy.decode, Decode::Json);
        assert_eq!(policy.failure, FailurePolicy::AllRequired);
        assert_eq!(policy.resources, vec![ResourceId::new("https://cdn.test/loop.json")]);
    }

    #[test]
    fn inline_sources_need_no_load() {
        let policy = VectorAnimation::inline(json!({"fr": 30})).policy(&PageConfig::default());
        assert!(policy.resources.is_empty());
        assert!(!policy.has(Capabilities::ASYNC_ASSETS));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn plays_the_loaded_document() {
        let id = ResourceId::new("https://cdn.test/loop.json");
        let mut load = LoadSet::new([id.clone()]);
        load.record_success(id.clone(), Payload::Json(json!({"fr": 30})));

        let anim = VectorAnimation::remote(id);
        let frame = anim.frame(&presentation(PresentationState::Active { variant: 0, revealed: true }, Some(load)));
        assert_eq!(
            frame,
            AnimationFrame::Play {
                data: json!({"fr": 30}),
                looping: true,
                autoplay: true
            }
        );
    }

    #[test]
    fn failure_and_reduced_motion_show_poster_or_nothing() {
        let id = ResourceId::new("https://cdn.test/loop.json");
        let mut load = LoadSet::new([id.clone()]);
        load.record_failure(id.clone(), ResourceFetchFailure::Decode("eof".into()));

        let failed = presentation(PresentationState::StaticFallback(FallbackReason::LoadFailed), Some(load));
        assert_eq!(VectorAnimation::remote(id.clone()).frame(&failed), AnimationFrame::Hidden);

        let anim = VectorAnimation::remote(id).with_poster("/assets/posters/loop.png");
        assert_eq!(anim.frame(&failed), AnimationFrame::Poster(ResourceId::new("/assets/posters/loop.png")));

        let reduced = presentation(PresentationState::Placeholder(FallbackReason::ReducedMotion), None);
        assert_eq!(VectorAnimation::inline(json!({})).frame(&reduced), AnimationFrame::Hidden);
    }

    #[test]
    fn loading_shows_the_placeholder() {
        let anim = VectorAnimation::remote("https://cdn.test/loop.json");
        assert_eq!(anim.frame(&presentation(PresentationState::Loading, None)), AnimationFrame::Loading);
    }

    #[test]
    fn source_deserializes_from_string_or_document() {
        let remote: VectorAnimation = serde_json::from_value(json!({"source": "https://cdn.test/a.json"})).unwrap();
        assert_eq!(remote.source, AnimationSource::Remote(ResourceId::new("https://cdn.test/a.json")));
        assert!(remote.looping && remote.autoplay);

        let inline: VectorAnimation =
            serde_json::from_value(json!({"source": {"v": "5.7.4"}, "looping": false})).unwrap();
        assert!(matches!(inline.source, AnimationSource::Inline(_)));
        assert!(!inline.looping);
    }
}
