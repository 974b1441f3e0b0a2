//! Presentation backends for the motion engine.

pub mod null;
