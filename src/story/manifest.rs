use std::{fs, path::Path};

use anyhow::Context;
use serde::Serialize;

use super::{
    cards::{Card, CONFIRMATION_DELAY, HIDE_ANIMATION, SCROLL_END_TOLERANCE},
    config::{SectionConfig, StoryConfig},
    fade::{Placement, REVEAL_THRESHOLD},
    section::{EntranceAnimation, VISIBILITY_THRESHOLD},
};

pub const MANIFEST_FILENAME: &str = "story.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Rendered,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FadeInBoxEntry {
    pub text: String,
    pub placement: Placement,
    pub delay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionEntry {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<Card>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fade_boxes: Vec<FadeInBoxEntry>,
    pub status: SectionStatus,
    /// Sidecar describing the rendered artifacts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidecar: Option<String>,
    /// Message shown in place of the map when rendering failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SectionEntry {
    fn new(section: &SectionConfig, status: SectionStatus) -> Self {
        Self {
            id: section.id.clone(),
            title: section.title.clone(),
            subtitle: section.subtitle.clone(),
            kind: section.visualization.kind(),
            cards: section.cards.clone(),
            fade_boxes: section
                .fade_boxes
                .iter()
                .enumerate()
                .map(|(index, fade_box)| FadeInBoxEntry {
                    text: fade_box.text.clone(),
                    placement: fade_box.placement(index),
                    delay: fade_box.delay,
                })
                .collect(),
            status,
            sidecar: None,
            error: None,
        }
    }

    pub fn rendered(section: &SectionConfig, sidecar: String) -> Self {
        Self {
            sidecar: Some(sidecar),
            ..Self::new(section, SectionStatus::Rendered)
        }
    }

    pub fn failed(section: &SectionConfig, error: &anyhow::Error) -> Self {
        Self {
            error: Some(format!("{:#}", error)),
            ..Self::new(section, SectionStatus::Failed)
        }
    }
}

/// Thresholds and animation a front end needs to drive the scroll behaviour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrollSettings {
    pub section_visibility: f64,
    pub fade_in_visibility: f64,
    pub hidden: EntranceAnimation,
    pub shown: EntranceAnimation,
    pub cards_confirmation_ms: u64,
    pub cards_hide_ms: u64,
    pub scroll_end_tolerance: f64,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            section_visibility: VISIBILITY_THRESHOLD,
            fade_in_visibility: REVEAL_THRESHOLD,
            hidden: EntranceAnimation::HIDDEN,
            shown: EntranceAnimation::SHOWN,
            cards_confirmation_ms: CONFIRMATION_DELAY.as_millis() as u64,
            cards_hide_ms: HIDE_ANIMATION.as_millis() as u64,
            scroll_end_tolerance: SCROLL_END_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryManifest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub tile_url: String,
    pub scroll: ScrollSettings,
    pub sections: Vec<SectionEntry>,
}

impl StoryManifest {
    pub fn new(config: &StoryConfig, sections: Vec<SectionEntry>) -> Self {
        Self {
            title: config.title.clone(),
            tile_url: config.tile_url.clone(),
            scroll: ScrollSettings::default(),
            sections,
        }
    }

    pub fn failed_count(&self) -> usize {
        self.sections
            .iter()
            .filter(|section| section.status == SectionStatus::Failed)
            .count()
    }

    pub fn write(&self, output_dir: &Path) -> anyhow::Result<()> {
        let filepath = output_dir.join(MANIFEST_FILENAME);
        fs::write(&filepath, serde_yaml::to_string(self)?)
            .with_context(|| format!("Writing manifest {:?}", filepath))?;
        log::info!("Wrote story manifest to {:?}", filepath);
        Ok(())
    }
}
