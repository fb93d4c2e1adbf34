use serde::{Deserialize, Serialize};

use super::{
    class_map::{ClassColorMap, ClassRanges},
    hex::Rgba,
    palette::OrdinalScale,
    ramp::ColorRamp,
};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgba,
}

/// Map key written next to every rendered layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Legend {
    Categories {
        title: String,
        entries: Vec<LegendEntry>,
    },
    Gradient {
        title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
        min: f64,
        max: f64,
        colors: Vec<Rgba>,
    },
}

impl Legend {
    pub fn from_ordinal_scale(title: &str, scale: &OrdinalScale) -> Self {
        let entries = scale
            .domain()
            .iter()
            .filter_map(|value| {
                scale.get(value).map(|color| LegendEntry {
                    label: value.clone(),
                    color,
                })
            })
            .collect();
        Legend::Categories {
            title: title.to_owned(),
            entries,
        }
    }

    pub fn from_class_map(title: &str, map: &ClassColorMap) -> Self {
        Legend::Categories {
            title: title.to_owned(),
            entries: map
                .entries()
                .map(|(value, color)| LegendEntry {
                    label: value.to_string(),
                    color,
                })
                .collect(),
        }
    }

    pub fn from_class_ranges(title: &str, ranges: &ClassRanges) -> Self {
        Legend::Categories {
            title: title.to_owned(),
            entries: ranges
                .ranges()
                .iter()
                .map(|range| LegendEntry {
                    label: range
                        .label
                        .clone()
                        .unwrap_or_else(|| format!("{} - {}", range.min, range.max)),
                    color: range.color,
                })
                .collect(),
        }
    }

    /// Gradient key sampling `steps` colors evenly across [min, max].
    pub fn sampled_gradient(
        title: &str,
        unit: Option<&str>,
        ramp: &ColorRamp,
        min: f64,
        max: f64,
        steps: usize,
    ) -> Self {
        let steps = steps.max(2);
        let colors = (0..steps)
            .map(|step| {
                let value = min + (max - min) * step as f64 / (steps - 1) as f64;
                ramp.interpolate_value(value, min, max)
            })
            .collect();
        Legend::Gradient {
            title: title.to_owned(),
            unit: unit.map(str::to_owned),
            min,
            max,
            colors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Legend;
    use crate::color::{
        class_map::ClassRanges, hex::Rgba, palette::OrdinalScale, palette::Palette, ramp::ColorRamp,
    };

    #[test]
    fn test_legend_from_ordinal_scale_keeps_domain_order() {
        let scale = OrdinalScale::with_domain(Palette::Set1, ["Muy alto", "Bajo"]);
        match Legend::from_ordinal_scale("GM_2020", &scale) {
            Legend::Categories { title, entries } => {
                assert_eq!("GM_2020", title);
                assert_eq!("Muy alto", entries[0].label);
                assert_eq!(Rgba::from_hex("#e41a1c").unwrap(), entries[0].color);
                assert_eq!("Bajo", entries[1].label);
            }
            other => panic!("Unexpected legend {:?}", other),
        }
    }

    #[test]
    fn test_sampled_gradient() {
        let ramp = ColorRamp::from_colors(vec![
            Rgba::from_hex("#ffffff").unwrap(),
            Rgba::from_hex("#ff0000").unwrap(),
        ])
        .unwrap();
        match Legend::sampled_gradient("Potencial", None, &ramp, 0.0, 10.0, 3) {
            Legend::Gradient { colors, min, max, .. } => {
                assert_eq!((0.0, 10.0), (min, max));
                let hex: Vec<String> = colors.iter().map(Rgba::to_hex).collect();
                assert_eq!(vec!["#ffffff", "#ff8080", "#ff0000"], hex);
            }
            other => panic!("Unexpected legend {:?}", other),
        }
    }

    #[test]
    fn test_legend_serializes_to_yaml() {
        let legend = Legend::from_class_ranges("Potencial", &ClassRanges::productivity_potential());
        let yaml = serde_yaml::to_string(&legend).unwrap();
        assert!(yaml.contains("kind: categories"), "{}", yaml);
        assert!(yaml.contains("label: Bajo"), "{}", yaml);
        assert!(yaml.contains("#aaaaaa"), "{}", yaml);
    }
}
