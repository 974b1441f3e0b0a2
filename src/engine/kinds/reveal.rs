use crate::engine::config::PageConfig;
use crate::engine::unit::{Capabilities, PresentableUnit, Presentation, PresentationState, UnitKind, UnitPolicy};
use crate::engine::viewport::ElementRef;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Distance, in CSS pixels, hidden content sits away from its final position.
pub const REVEAL_OFFSET: f64 = 30.0;

/// CSS-style `cubic-bezier(x1, y1, x2, y2)` timing curve.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CubicBezier {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Eased value for linear progress `x`.
    pub fn apply(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }

        // Find u with bx(u) == x, then return by(u).
        let mut u = x;
        for _ in 0..8 {
            let err = sample(self.x1, self.x2, u) - x;
            if err.abs() < 1e-9 {
                return sample(self.y1, self.y2, u);
            }
            let d = slope(self.x1, self.x2, u);
            if d.abs() < 1e-7 {
                break;
            }
            u = (u - err / d).clamp(0.0, 1.0);
        }

        // Newton stalled, bisect.
        let (mut lo, mut hi) = (0.0, 1.0);
        u = x;
        for _ in 0..40 {
            if sample(self.x1, self.x2, u) < x {
                lo = u;
            } else {
                hi = u;
            }
            u = 0.5 * (lo + hi);
        }
        sample(self.y1, self.y2, u)
    }
}

fn sample(a1: f64, a2: f64, u: f64) -> f64 {
    let v = 1.0 - u;
    3.0 * v * v * u * a1 + 3.0 * v * u * u * a2 + u * u * u
}

fn slope(a1: f64, a2: f64, u: f64) -> f64 {
    let v = 1.0 - u;
    3.0 * v * v * a1 + 6.0 * v * u * (a2 - a1) + 3.0 * u * u * (1.0 - a2)
}

/// Ease-out-quad lookalike used by every reveal on the site.
pub const REVEAL_EASE: CubicBezier = CubicBezier::new(0.25, 0.46, 0.45, 0.94);

/// Side the content slides in from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// `(x, y)` offset while hidden.
    pub fn hidden_offset(self) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, REVEAL_OFFSET),
            Direction::Down => (0.0, -REVEAL_OFFSET),
            Direction::Left => (REVEAL_OFFSET, 0.0),
            Direction::Right => (-REVEAL_OFFSET, 0.0),
        }
    }
}

fn default_duration() -> f64 {
    0.6
}

/// Fade-and-slide entrance for a block of content, played once when it scrolls into view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reveal {
    pub element: ElementRef,
    #[serde(default)]
    pub direction: Direction,
    /// Seconds
    #[serde(default)]
    pub delay: f64,
    /// Seconds
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default)]
    pub threshold: Option<f32>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RevealFrame {
    pub opacity: f64,
    pub x: f64,
    pub y: f64,
}

impl RevealFrame {
    pub const IDENTITY: RevealFrame = RevealFrame { opacity: 1.0, x: 0.0, y: 0.0 };
}

impl Reveal {
    pub fn new(element: impl Into<ElementRef>) -> Self {
        Self {
            element: element.into(),
            direction: Direction::default(),
            delay: 0.0,
            duration: default_duration(),
            threshold: None,
        }
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn delay(mut self, secs: f64) -> Self {
        self.delay = secs;
        self
    }

    pub fn duration(mut self, secs: f64) -> Self {
        self.duration = secs;
        self
    }

    /// `since_reveal` is the time since the unit became revealed.
    pub fn frame(&self, presentation: &Presentation, since_reveal: Duration) -> RevealFrame {
        match presentation.state {
            PresentationState::Active { revealed: true, .. } => {
                let t = since_reveal.as_secs_f64() - self.delay;
                let linear = if self.duration <= 0.0 {
                    if t >= 0.0 { 1.0 } else { 0.0 }
                } else {
                    (t / self.duration).clamp(0.0, 1.0)
                };
                self.interpolate(REVEAL_EASE.apply(linear))
            }
            PresentationState::Idle | PresentationState::Loading | PresentationState::Active { .. } => {
                self.interpolate(0.0)
            }
            // Content is shown as-is when motion is unwanted.
            _ => RevealFrame::IDENTITY,
        }
    }

    fn interpolate(&self, eased: f64) -> RevealFrame {
        let (hx, hy) = self.direction.hidden_offset();
        RevealFrame {
            opacity: eased,
            x: hx * (1.0 - eased),
            y: hy * (1.0 - eased),
        }
    }
}

impl PresentableUnit for Reveal {
    fn kind(&self) -> UnitKind {
        UnitKind::Reveal
    }

    fn policy(&self, config: &PageConfig) -> UnitPolicy {
        UnitPolicy {
            capabilities: Capabilities::VIEWPORT_GATED,
            static_substitute: true,
            element: Some(self.element.clone()),
            threshold: self.threshold.unwrap_or(config.default_threshold),
            ..UnitPolicy::new(UnitKind::Reveal)
        }
    }
}
