pub mod classify;
pub mod grid;
pub mod overlay;
pub mod png;
pub mod stats;
