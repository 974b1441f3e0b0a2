use crate::engine::config::ConfigError;

/// Errors returned to the host when a page or unit is misused.
///
/// Resource failures never show up here: they are aggregated into a
/// [`LoadSet`](crate::engine::loader::LoadSet) and degrade the unit to a fallback state.
#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    #[error("Invalid page configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Invalid unit declaration: {0}")]
    InvalidUnit(String),

    #[error("Unit limit exceeded")]
    UnitLimitExceeded,

    #[error("No async runtime available to drive the unit")]
    NoRuntime,
}

/// A single resource failed to fetch or decode.
///
/// Never propagated as an error by the loader; it ends up in `LoadSet::failures`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceFetchFailure {
    #[error("Cannot resolve resource '{0}'")]
    Unresolvable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected HTTP status {status} for '{url}'")]
    Status { url: String, status: u16 },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Resource not found: {0}")]
    NotFound(String),
}

/// The platform could not answer a preference query. Treated as "motion allowed".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Platform preference query unavailable: {0}")]
pub struct PlatformQueryUnavailable(pub String);
