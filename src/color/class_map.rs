use std::collections::BTreeMap;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use super::hex::Rgba;

/// Exact-match lookup from integer class codes to colors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassColorMap {
    classes: BTreeMap<i64, Rgba>,
}

impl ClassColorMap {
    pub fn new(classes: BTreeMap<i64, Rgba>) -> Self {
        Self { classes }
    }

    /// Parse `"value:color,value:color"`, e.g. `"1:#1a9641,2:a6d96a"`.
    ///
    /// Entries missing either side of the colon are skipped. An empty string yields an empty map.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let mut classes = BTreeMap::new();
        for pair in text.split(',') {
            let mut parts = pair.splitn(2, ':');
            let (value, color) = match (parts.next(), parts.next()) {
                (Some(value), Some(color)) if !value.trim().is_empty() && !color.trim().is_empty() => {
                    (value.trim(), color.trim())
                }
                _ => {
                    if !pair.trim().is_empty() {
                        log::warn!("Skipping malformed color map entry '{}'", pair);
                    }
                    continue;
                }
            };
            let value: i64 = value
                .parse()
                .with_context(|| format!("Class '{}' is not an integer", value))?;
            classes.insert(value, Rgba::from_hex(color)?);
        }
        Ok(Self { classes })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Color of the class nearest to `value`; transparent when the class is unmapped.
    pub fn color_for(&self, value: f64) -> Rgba {
        if !value.is_finite() {
            return Rgba::TRANSPARENT;
        }
        self.classes
            .get(&(value.round() as i64))
            .copied()
            .unwrap_or(Rgba::TRANSPARENT)
    }

    /// Whether `value` rounds to one of the listed classes.
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && self.classes.contains_key(&(value.round() as i64))
    }

    pub fn entries(&self) -> impl Iterator<Item = (i64, Rgba)> + '_ {
        self.classes.iter().map(|(value, color)| (*value, *color))
    }
}

/// Inclusive value range drawn in a single color.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClassRange {
    pub min: f64,
    pub max: f64,
    pub color: Rgba,
    #[serde(default)]
    pub label: Option<String>,
}

/// Ordered list of value ranges. The first range containing a value wins.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Vec<ClassRange>")]
pub struct ClassRanges {
    ranges: Vec<ClassRange>,
}

impl ClassRanges {
    pub fn new(ranges: Vec<ClassRange>) -> anyhow::Result<Self> {
        for range in &ranges {
            if !(range.min <= range.max) {
                return Err(anyhow!(
                    "Invalid class range [{}, {}]",
                    range.min,
                    range.max
                ));
            }
        }
        Ok(Self { ranges })
    }

    /// Productivity potential classes: low, medium, high and very high.
    pub fn productivity_potential() -> Self {
        let range = |min: f64, max: f64, color: Rgba, label: &str| ClassRange {
            min,
            max,
            color,
            label: Some(label.to_owned()),
        };
        Self {
            ranges: vec![
                range(0.0, 10.0, Rgba::opaque(0xaa, 0xaa, 0xaa), "Bajo"),
                range(11.0, 21.0, Rgba::opaque(0xff, 0xff, 0x00), "Medio"),
                range(22.0, 53.0, Rgba::opaque(0x00, 0xcc, 0x00), "Alto"),
                range(54.0, 75.0, Rgba::opaque(0x00, 0x64, 0x00), "Muy alto"),
            ],
        }
    }

    pub fn ranges(&self) -> &[ClassRange] {
        &self.ranges
    }

    /// Color of the first range containing `value`; transparent for negative, NaN or unmatched values.
    pub fn color_for(&self, value: f64) -> Rgba {
        if value.is_nan() || value < 0.0 {
            return Rgba::TRANSPARENT;
        }
        self.ranges
            .iter()
            .find(|range| range.min <= value && value <= range.max)
            .map(|range| range.color)
            .unwrap_or(Rgba::TRANSPARENT)
    }
}

impl TryFrom<Vec<ClassRange>> for ClassRanges {
    type Error = anyhow::Error;

    fn try_from(ranges: Vec<ClassRange>) -> anyhow::Result<Self> {
        Self::new(ranges)
    }
}
