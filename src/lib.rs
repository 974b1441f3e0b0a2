//! Adaptive media presentation for a marketing site.
//!
//! Every animated or asynchronously loaded visual element on a page is a
//! *presentable unit*. Units share one engine that watches the reduced-motion
//! preference, loads their assets with partial-failure tolerance, waits for
//! them to scroll into view, and follows scroll progress. See [`page::Page`]
//! for the entry point and [`kinds`] for the unit kinds the site uses.

pub mod engine;
pub mod render;

pub use engine::*;
