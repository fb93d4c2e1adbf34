pub mod class_map;
pub mod hex;
pub mod legend;
pub mod palette;
pub mod ramp;
