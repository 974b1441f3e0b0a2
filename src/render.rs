pub mod backend;
pub mod backends;

pub use backend::{MountHandle, PresentationBackend, SharedBackend};
