//! Serializable unit declarations.
//!
//! Pages describe their units in JSON, tagged by `kind`:
//!
//! ```
//! use site_motion::kinds::UnitSpec;
//!
//! let units = UnitSpec::list_from_json(r##"[
//!     {"kind": "scroll_background", "variants": ["/assets/images/backgrounds/hero-1.jpg"]},
//!     {"kind": "lazy_scene", "element": ".isometric-container", "fallback_precedence": "reduced_motion"},
//!     {"kind": "reveal", "element": "#about", "direction": "left", "delay": 0.2}
//! ]"##).unwrap();
//! assert_eq!(units.len(), 3);
//! ```

use super::{LazyScene, Reveal, ScrollBackground, VectorAnimation};
use crate::engine::config::PageConfig;
use crate::engine::errors::PresentError;
use crate::engine::unit::{PresentableUnit, UnitKind, UnitPolicy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitSpec {
    ScrollBackground(ScrollBackground),
    LazyScene(LazyScene),
    VectorAnimation(VectorAnimation),
    Reveal(Reveal),
}

impl UnitSpec {
    pub fn from_json(json: &str) -> Result<Self, PresentError> {
        serde_json::from_str(json).map_err(|e| PresentError::InvalidUnit(e.to_string()))
    }

    pub fn list_from_json(json: &str) -> Result<Vec<Self>, PresentError> {
        serde_json::from_str(json).map_err(|e| PresentError::InvalidUnit(e.to_string()))
    }

    fn inner(&self) -> &dyn PresentableUnit {
        match self {
            UnitSpec::ScrollBackground(u) => u,
            UnitSpec::LazyScene(u) => u,
            UnitSpec::VectorAnimation(u) => u,
            UnitSpec::Reveal(u) => u,
        }
    }
}

impl PresentableUnit for UnitSpec {
    fn kind(&self) -> UnitKind {
        self.inner().kind()
    }

    fn policy(&self, config: &PageConfig) -> UnitPolicy {
        self.inner().policy(config)
    }
}
