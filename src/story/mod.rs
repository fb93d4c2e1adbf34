pub mod cards;
pub mod config;
pub mod fade;
pub mod manifest;
pub mod runner;
pub mod section;
