//! Scroll progress sampling.
//!
//! The platform reports raw scroll/resize events with
//! [`ScrollMetric::notify_scroll`]. Those only mark the metric dirty; the
//! next frame [`tick`](ScrollMetric::tick) samples live geometry and delivers
//! the latest progress to subscribers. Subscribers therefore never see more
//! than one update per frame interval, and intermediate positions are
//! coalesced.
//!
//! ```
//! use site_motion::scroll::ScrollSample;
//!
//! let sample = ScrollSample::new(1000.0, 1000.0, 3000.0);
//! assert_eq!(sample.progress(), 0.5);
//!
//! // No scroll range at all
//! assert_eq!(ScrollSample::new(50.0, 1000.0, 800.0).progress(), 0.0);
//! ```

use crate::engine::subscription::{Listeners, Subscription};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const EPSILON: f64 = 1e-6;

/// Snapshot of the page geometry relevant to scrolling, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollSample {
    pub scroll_y: f64,
    pub viewport_height: f64,
    pub document_height: f64,
}

impl ScrollSample {
    pub fn new(scroll_y: f64, viewport_height: f64, document_height: f64) -> Self {
        Self { scroll_y, viewport_height, document_height }
    }

    /// Normalized progress through the scrollable range, always in `[0, 1]`.
    ///
    /// A document that fits in the viewport has no range and reports `0`.
    pub fn progress(&self) -> f64 {
        let range = self.document_height - self.viewport_height;
        if !(range > 0.0) {
            return 0.0;
        }

        let progress = self.scroll_y / range.max(EPSILON);
        if progress.is_nan() {
            return 0.0;
        }
        progress.clamp(0.0, 1.0)
    }
}

/// Live scroll geometry of the host document.
pub trait ScrollGeometry: Send + Sync {
    fn sample(&self) -> ScrollSample;

    /// Attach (`true`) or detach (`false`) the platform scroll listener.
    fn set_listening(&self, _listening: bool) {}
}

/// In-memory geometry the host (or a test) updates directly.
#[derive(Debug, Default)]
pub struct SharedGeometry {
    sample: Mutex<ScrollSample>,
    listening: AtomicBool,
}

impl SharedGeometry {
    pub fn new(sample: ScrollSample) -> Self {
        Self { sample: Mutex::new(sample), listening: AtomicBool::new(false) }
    }

    pub fn set(&self, sample: ScrollSample) {
        *self.sample.lock().unwrap_or_else(|e| e.into_inner()) = sample;
    }

    pub fn scroll_to(&self, scroll_y: f64) {
        self.sample.lock().unwrap_or_else(|e| e.into_inner()).scroll_y = scroll_y;
    }

    pub fn resize(&self, viewport_height: f64, document_height: f64) {
        let mut s = self.sample.lock().unwrap_or_else(|e| e.into_inner());
        s.viewport_height = viewport_height;
        s.document_height = document_height;
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

impl ScrollGeometry for SharedGeometry {
    fn sample(&self) -> ScrollSample {
        *self.sample.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_listening(&self, listening: bool) {
        self.listening.store(listening, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct Throttle {
    dirty: bool,
    last_emit: Option<Instant>,
}

/// Page-wide throttled scroll progress.
pub struct ScrollMetric {
    geometry: Arc<dyn ScrollGeometry>,
    listeners: Listeners<f64>,
    throttle: Mutex<Throttle>,
    frame_interval: Duration,
}

impl std::fmt::Debug for ScrollMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollMetric")
            .field("frame_interval", &self.frame_interval)
            .field("subscribers", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl ScrollMetric {
    pub fn new(geometry: Arc<dyn ScrollGeometry>, frame_interval: Duration) -> Self {
        let hook_geometry = geometry.clone();
        let listeners = Listeners::with_occupancy_hook(move |listening| {
            log::debug!("scroll listener {}", if listening { "attached" } else { "detached" });
            hook_geometry.set_listening(listening);
        });

        Self {
            geometry,
            listeners,
            throttle: Mutex::new(Throttle::default()),
            frame_interval,
        }
    }

    /// Sample the live geometry. Never cached.
    pub fn sample(&self) -> ScrollSample {
        self.geometry.sample()
    }

    pub fn current_progress(&self) -> f64 {
        self.sample().progress()
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn subscribe(&self, callback: impl Fn(&f64) + Send + Sync + 'static) -> Subscription {
        self.listeners.subscribe(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Raw scroll (or layout) event from the platform.
    pub fn notify_scroll(&self) {
        if self.listeners.is_empty() {
            return;
        }
        self.throttle.lock().unwrap_or_else(|e| e.into_inner()).dirty = true;
    }

    /// Frame callback. Delivers the latest progress when something changed and
    /// at least one frame interval has passed since the previous delivery.
    pub fn tick(&self) -> Option<f64> {
        if self.listeners.is_empty() {
            return None;
        }

        {
            let mut throttle = self.throttle.lock().unwrap_or_else(|e| e.into_inner());
            if !throttle.dirty {
                return None;
            }

            let now = Instant::now();
            if let Some(last) = throttle.last_emit {
                if now.duration_since(last) < self.frame_interval {
                    return None;
                }
            }

            throttle.dirty = false;
            throttle.last_emit = Some(now);
        }

        let progress = self.current_progress();
        self.listeners.emit(&progress);
        Some(progress)
    }

    /// Drive [`tick`](Self::tick) once per frame interval until `cancel` fires.
    pub fn spawn_frame_loop(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let metric = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(metric.frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        metric.tick();
                    }
                }
            }
        })
    }
}
