use std::time::{Duration, Instant};

use serde::Serialize;

use super::cards::{CardsOverlay, ScrollMetrics};

/// Share of a section that must be in the viewport for it to count as visible.
pub const VISIBILITY_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionState {
    Hidden,
    /// In view with nothing over the map.
    Visible,
    /// In view with the cards overlay shown.
    OverlayActive,
    /// In view after the reader dismissed the cards.
    OverlayDismissed,
}

/// Opacity and vertical offset a section animates to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntranceAnimation {
    pub opacity: f64,
    pub offset_y: f64,
    #[serde(with = "seconds")]
    pub duration: Duration,
}

impl EntranceAnimation {
    pub const HIDDEN: EntranceAnimation = EntranceAnimation {
        opacity: 0.0,
        offset_y: 50.0,
        duration: Duration::from_millis(800),
    };
    pub const SHOWN: EntranceAnimation = EntranceAnimation {
        opacity: 1.0,
        offset_y: 0.0,
        duration: Duration::from_millis(800),
    };
}

mod seconds {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

/// Visibility of one story section and the cards overlaid on it.
///
/// The section becomes visible once at least [`VISIBILITY_THRESHOLD`] of it intersects the
/// viewport and hidden again below that, which also resets the cards.
#[derive(Debug, Clone)]
pub struct SectionController {
    in_view: bool,
    cards: CardsOverlay,
}

impl SectionController {
    pub fn new(card_count: usize) -> Self {
        Self {
            in_view: false,
            cards: CardsOverlay::new(card_count),
        }
    }

    pub fn state(&self) -> SectionState {
        if !self.in_view {
            SectionState::Hidden
        } else if self.cards.card_count() == 0 {
            SectionState::Visible
        } else if self.cards.is_dismissed() {
            SectionState::OverlayDismissed
        } else {
            SectionState::OverlayActive
        }
    }

    /// Update from the fraction of the section inside the viewport.
    pub fn on_visibility(&mut self, ratio: f64) {
        let in_view = ratio >= VISIBILITY_THRESHOLD;
        if in_view == self.in_view {
            return;
        }
        self.in_view = in_view;
        if !in_view {
            self.cards.reset();
        }
        log::debug!("Section is now {:?}", self.state());
    }

    pub fn on_cards_scroll(&mut self, metrics: ScrollMetrics, now: Instant) {
        if self.in_view {
            self.cards.on_scroll(metrics, now);
        }
    }

    pub fn on_background_click(&mut self, now: Instant) {
        if self.in_view {
            self.cards.on_background_click(now);
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.cards.tick(now);
    }

    pub fn cards(&self) -> &CardsOverlay {
        &self.cards
    }

    /// The overlay is shown only while the section is in view and the cards are not dismissed.
    pub fn shows_overlay(&self) -> bool {
        self.state() == SectionState::OverlayActive
    }

    pub fn animation(&self) -> EntranceAnimation {
        if self.in_view {
            EntranceAnimation::SHOWN
        } else {
            EntranceAnimation::HIDDEN
        }
    }
}
