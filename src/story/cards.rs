use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Distance from the bottom, in pixels, that still counts as scrolled to the end.
pub const SCROLL_END_TOLERANCE: f64 = 10.0;

/// How long the overlay stays after the reader reaches the end of the cards.
pub const CONFIRMATION_DELAY: Duration = Duration::from_millis(2000);

/// Length of the overlay's exit animation.
pub const HIDE_ANIMATION: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Metric {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Card {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<Metric>,
}

/// Scroll position of the cards container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub client_height: f64,
    pub scroll_height: f64,
}

impl ScrollMetrics {
    pub fn at_end(&self) -> bool {
        self.scroll_top + self.client_height >= self.scroll_height - SCROLL_END_TOLERANCE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Reading,
    /// Reached the end; hiding starts once the confirmation delay has passed.
    Confirming { since: Instant },
    Hiding { since: Instant },
    Dismissed,
}

/// Reading flow of the cards shown over a section's map.
///
/// The overlay stays until the reader scrolls to the end of the cards, then hides after
/// [`CONFIRMATION_DELAY`] plus [`HIDE_ANIMATION`]. Clicking the background starts the hide
/// animation right away. Time is passed in by the caller so the flow can be driven by any
/// event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardsOverlay {
    card_count: usize,
    phase: Phase,
    reached_end: bool,
}

impl CardsOverlay {
    /// An overlay over `card_count` cards. Without cards there is nothing to read and the
    /// overlay starts dismissed.
    pub fn new(card_count: usize) -> Self {
        Self {
            card_count,
            phase: Self::initial_phase(card_count),
            reached_end: false,
        }
    }

    fn initial_phase(card_count: usize) -> Phase {
        if card_count == 0 {
            Phase::Dismissed
        } else {
            Phase::Reading
        }
    }

    /// Back to the first card, as when the section comes into view again.
    pub fn reset(&mut self) {
        self.phase = Self::initial_phase(self.card_count);
        self.reached_end = false;
    }

    pub fn on_scroll(&mut self, metrics: ScrollMetrics, now: Instant) {
        if self.phase == Phase::Reading && metrics.at_end() {
            log::debug!("Cards read to the end");
            self.reached_end = true;
            self.phase = Phase::Confirming { since: now };
        }
    }

    pub fn on_background_click(&mut self, now: Instant) {
        if matches!(self.phase, Phase::Reading | Phase::Confirming { .. }) {
            self.phase = Phase::Hiding { since: now };
        }
    }

    /// Advance timed transitions up to `now`.
    pub fn tick(&mut self, now: Instant) {
        if let Phase::Confirming { since } = self.phase {
            let hide_at = since + CONFIRMATION_DELAY;
            if now >= hide_at {
                self.phase = Phase::Hiding { since: hide_at };
            }
        }
        if let Phase::Hiding { since } = self.phase {
            if now >= since + HIDE_ANIMATION {
                self.phase = Phase::Dismissed;
            }
        }
    }

    pub fn card_count(&self) -> usize {
        self.card_count
    }

    pub fn is_visible(&self) -> bool {
        self.phase != Phase::Dismissed
    }

    pub fn is_dismissed(&self) -> bool {
        self.phase == Phase::Dismissed
    }

    pub fn is_hiding(&self) -> bool {
        matches!(self.phase, Phase::Hiding { .. })
    }

    pub fn reached_end(&self) -> bool {
        self.reached_end
    }

    pub fn shows_scroll_hint(&self) -> bool {
        self.is_visible() && !self.reached_end && !self.is_hiding()
    }

    /// Fill of the progress bar, 0 until the end is reached and 1 after.
    pub fn progress(&self) -> f64 {
        if self.reached_end {
            1.0
        } else {
            0.0
        }
    }

    pub fn shows_completion_message(&self) -> bool {
        self.is_visible() && self.reached_end && !self.is_hiding()
    }
}
