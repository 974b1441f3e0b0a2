//! Page configuration.
//!
//! `PageConfig` controls the page-wide knobs shared by every presentable unit:
//! the frame cadence of the scroll sampler, the default viewport threshold,
//! limits, and where relative asset paths are resolved.
//!
//! `PageConfig` provides defaults via [`Default`], a fluent
//! [`PageConfig::builder()`] with validation, and JSON loading through serde.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use site_motion::config::PageConfig;
//! let cfg = PageConfig::default();
//! assert_eq!(cfg.frame_interval_ms, 16);
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use site_motion::config::PageConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = PageConfig::builder()
//!     .frame_interval_ms(33)
//!     .default_threshold(0.25)
//!     .asset_base_url("https://example.test/site/")
//!     .build()?;
//! # Ok(()) }
//! ```
//!
//! ## Load from JSON
//! ```rust
//! use site_motion::config::PageConfig;
//! let cfg = PageConfig::from_json(r#"{ "max_units": 8 }"#).unwrap();
//! assert_eq!(cfg.max_units, 8);
//! assert_eq!(cfg.crossfade_ms, 500);
//! ```
//!
//! # Fields (summary)
//! - `frame_interval_ms`: Minimum spacing between scroll samples (default: 16, one 60 Hz frame).
//! - `default_threshold`: Visible fraction that counts as "entered" (default: 0.1, range `(0, 1]`).
//! - `max_units`: Maximum number of live units on a page (default: 64).
//! - `channel_capacity`: Capacity of the page event bus (default: 64).
//! - `asset_base_url`: Base URL against which relative resource paths are resolved.
//! - `crossfade_ms`: Crossfade between background variants (default: 500).
//!
//! # Errors
//!
//! Builder validation returns [`ConfigError`] when values are out of range
//! (e.g. `default_threshold` outside `(0, 1]`, `max_units == 0`, or an
//! unparsable `asset_base_url`).

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

pub(crate) const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;
pub(crate) const DEFAULT_THRESHOLD: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub frame_interval_ms: u64,
    pub default_threshold: f32,
    pub max_units: usize,
    pub channel_capacity: usize,
    pub asset_base_url: Option<String>,
    pub crossfade_ms: u64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            default_threshold: DEFAULT_THRESHOLD,
            max_units: 64,
            channel_capacity: crate::engine::DEFAULT_CHANNEL_CAPACITY,
            asset_base_url: None,
            crossfade_ms: 500,
        }
    }
}

impl PageConfig {
    pub fn builder() -> PageConfigBuilder {
        PageConfigBuilder::default()
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<PageConfig, ConfigError> {
        let cfg: PageConfig = serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        validate(&cfg)?;
        Ok(cfg)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn crossfade(&self) -> Duration {
        Duration::from_millis(self.crossfade_ms)
    }
}

/// Builder for [`PageConfig`].
#[derive(Debug, Clone, Default)]
pub struct PageConfigBuilder {
    inner: PageConfig,
}

impl PageConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut PageConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn frame_interval_ms(self, ms: u64) -> Self { self.map(|c| c.frame_interval_ms = ms) }
    pub fn default_threshold(self, fraction: f32) -> Self { self.map(|c| c.default_threshold = fraction) }
    pub fn max_units(self, n: usize) -> Self { self.map(|c| c.max_units = n) }
    pub fn channel_capacity(self, n: usize) -> Self { self.map(|c| c.channel_capacity = n) }
    pub fn asset_base_url<S: Into<String>>(self, url: S) -> Self { self.map(|c| c.asset_base_url = Some(url.into())) }
    pub fn crossfade_ms(self, ms: u64) -> Self { self.map(|c| c.crossfade_ms = ms) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut PageConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<PageConfig, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidThreshold(f32),
    ZeroFrameInterval,
    ZeroUnits,
    ZeroChannelCapacity,
    InvalidBaseUrl(String),
    Json(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidThreshold(t) =>
                write!(f, "default_threshold {t} is out of range (expected 0 < t <= 1)"),
            ConfigError::ZeroFrameInterval =>
                write!(f, "frame_interval_ms must be at least 1"),
            ConfigError::ZeroUnits =>
                write!(f, "max_units must be at least 1"),
            ConfigError::ZeroChannelCapacity =>
                write!(f, "channel_capacity must be at least 1"),
            ConfigError::InvalidBaseUrl(u) =>
                write!(f, "asset_base_url '{u}' is not an absolute URL"),
            ConfigError::Json(e) =>
                write!(f, "cannot parse page configuration: {e}"),
        }
    }
}
impl std::error::Error for ConfigError {}

/// Returns true when `t` is a usable visibility threshold.
pub(crate) fn valid_threshold(t: f32) -> bool {
    t > 0.0 && t <= 1.0
}

pub(crate) fn validate(c: &PageConfig) -> Result<(), ConfigError> {
    if !valid_threshold(c.default_threshold) {
        return Err(ConfigError::InvalidThreshold(c.default_threshold));
    }
    if c.frame_interval_ms == 0 {
        return Err(ConfigError::ZeroFrameInterval);
    }
    if c.max_units == 0 {
        return Err(ConfigError::ZeroUnits);
    }
    if c.channel_capacity == 0 {
        return Err(ConfigError::ZeroChannelCapacity);
    }
    if let Some(base) = &c.asset_base_url {
        if url::Url::parse(base).is_err() {
            return Err(ConfigError::InvalidBaseUrl(base.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = PageConfig::builder().build().unwrap();
        assert_eq!(cfg, PageConfig::default());
        assert_eq!(cfg.frame_interval(), Duration::from_millis(16));
        assert_eq!(cfg.crossfade(), Duration::from_millis(500));
    }

    #[test]
    fn builder_rejects_out_of_range_threshold() {
        let err = PageConfig::builder().default_threshold(0.0).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidThreshold(0.0));

        let err = PageConfig::builder().default_threshold(1.5).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold(_)));

        assert!(PageConfig::builder().default_threshold(1.0).build().is_ok());
    }

    #[test]
    fn builder_rejects_zero_limits() {
        assert_eq!(PageConfig::builder().max_units(0).build().unwrap_err(), ConfigError::ZeroUnits);
        assert_eq!(
            PageConfig::builder().frame_interval_ms(0).build().unwrap_err(),
            ConfigError::ZeroFrameInterval
        );
        assert_eq!(
            PageConfig::builder().channel_capacity(0).build().unwrap_err(),
            ConfigError::ZeroChannelCapacity
        );
    }

    #[test]
    fn relative_base_url_is_rejected() {
        let err = PageConfig::builder().asset_base_url("/site/").build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));
        assert!(err.to_string().contains("/site/"));
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let cfg = PageConfig::from_json(r#"{ "frame_interval_ms": 8, "asset_base_url": "https://a.test/" }"#).unwrap();
        assert_eq!(cfg.frame_interval_ms, 8);
        assert_eq!(cfg.asset_base_url.as_deref(), Some("https://a.test/"));
        assert_eq!(cfg.max_units, 64);
    }

    #[test]
    fn json_is_validated() {
        assert!(matches!(PageConfig::from_json("{ not json"), Err(ConfigError::Json(_))));
        assert_eq!(
            PageConfig::from_json(r#"{ "default_threshold": 2.0 }"#).unwrap_err(),
            ConfigError::InvalidThreshold(2.0)
        );
    }
}
