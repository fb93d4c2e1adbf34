use serde::{Deserialize, Serialize};

/// Share of a fade-in box that must be in view before it appears.
pub const REVEAL_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxPosition {
    #[default]
    Left,
    Right,
    Center,
}

/// A short text floating over a section, shown while it is in view.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FadeInBox {
    pub text: String,
    #[serde(default)]
    pub position: BoxPosition,
    /// Seconds to wait before fading in.
    #[serde(default)]
    pub delay: f64,
}

/// Where a box sits, in percent of the section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub position: BoxPosition,
    pub top_percent: f64,
}

impl FadeInBox {
    /// Boxes stack downwards, 10% apart from a 20% start.
    pub fn placement(&self, index: usize) -> Placement {
        Placement {
            position: self.position,
            top_percent: 20.0 + index as f64 * 10.0,
        }
    }
}

pub fn is_revealed(visible_ratio: f64) -> bool {
    visible_ratio >= REVEAL_THRESHOLD
}
