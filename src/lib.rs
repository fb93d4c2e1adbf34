//! Renders a scrollable story map into static map layers, raster overlays and a manifest
//! describing how each section behaves while scrolling.
//!
//! The `story::section`, `story::cards` and `story::fade` controllers model the scroll
//! behaviour the manifest describes, for front ends that drive the story from Rust.
extern crate log;

pub mod color;
pub mod geofile;
pub mod geometry;
pub mod raster;
pub mod render;
pub mod story;
