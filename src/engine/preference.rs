//! Reduced-motion preference monitor.
//!
//! One [`PreferenceMonitor`] exists per page. It reads the platform once,
//! synchronously, when constructed, so [`current`](PreferenceMonitor::current)
//! is valid before any change notification arrives. The platform pushes
//! changes through [`platform_changed`](PreferenceMonitor::platform_changed);
//! subscribers receive each actual change once, in subscription order.

use crate::engine::errors::PlatformQueryUnavailable;
use crate::engine::subscription::{Listeners, Subscription};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Host accessibility settings.
pub trait PreferenceSource: Send + Sync {
    /// Returns `true` when the user asked for reduced motion.
    fn query(&self) -> Result<bool, PlatformQueryUnavailable>;
}

/// Preference source with a fixed answer. `None` behaves like a platform without the query.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPreference(pub Option<bool>);

impl PreferenceSource for FixedPreference {
    fn query(&self) -> Result<bool, PlatformQueryUnavailable> {
        self.0.ok_or_else(|| PlatformQueryUnavailable("no prefers-reduced-motion query".into()))
    }
}

pub struct PreferenceMonitor {
    reduce_motion: AtomicBool,
    /// Held across commit and delivery so racing changes reach subscribers in commit order.
    changes: Mutex<()>,
    listeners: Listeners<bool>,
}

impl std::fmt::Debug for PreferenceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceMonitor")
            .field("reduce_motion", &self.current())
            .field("subscribers", &self.listeners.len())
            .finish()
    }
}

impl PreferenceMonitor {
    pub fn new(source: &dyn PreferenceSource) -> Self {
        let reduce_motion = match source.query() {
            Ok(value) => value,
            Err(e) => {
                log::debug!("{e}; assuming motion is allowed");
                false
            }
        };

        Self {
            reduce_motion: AtomicBool::new(reduce_motion),
            changes: Mutex::new(()),
            listeners: Listeners::new(),
        }
    }

    pub fn shared(source: &dyn PreferenceSource) -> Arc<Self> {
        Arc::new(Self::new(source))
    }

    pub fn current(&self) -> bool {
        self.reduce_motion.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self, callback: impl Fn(&bool) + Send + Sync + 'static) -> Subscription {
        self.listeners.subscribe(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Platform change notification. Repeats of the current value are swallowed.
    ///
    /// Subscriber callbacks must not call back into `platform_changed`.
    pub fn platform_changed(&self, reduce_motion: bool) {
        let _changes = self.changes.lock().unwrap_or_else(|e| e.into_inner());
        if self.reduce_motion.swap(reduce_motion, Ordering::SeqCst) == reduce_motion {
            return;
        }

        log::info!("reduced-motion preference changed to {reduce_motion}");
        self.listeners.emit(&reduce_motion);
    }
}
