pub mod extent;
pub mod hull;
pub mod union;
