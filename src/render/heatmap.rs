use std::path::Path;

use serde::{Deserialize, Serialize};

use super::style::{display_value, styled_feature, PathStyle};
use crate::{
    color::{hex::Rgba, legend::Legend, ramp::ColorRamp},
    geofile::{
        feature::{Feature, FeatureCollection},
        geojson::write_features_to_geojson,
    },
    geometry::extent::Extent,
};

/// Number of colors in a heatmap ramp built from two endpoint colors.
pub const HEATMAP_RAMP_STEPS: usize = 10;

/// Attribute naming the municipality a feature belongs to.
pub const NAME_ATTRIBUTE: &str = "NOMGEO";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HeatmapConfig {
    pub source: String,
    pub value_column: String,
    /// Explicit ramp; replaces the start/end interpolation when set.
    #[serde(default)]
    pub color_ramp: Option<Vec<Rgba>>,
    #[serde(default = "default_start_color")]
    pub start_color: Rgba,
    #[serde(default = "default_end_color")]
    pub end_color: Rgba,
    #[serde(default = "default_border_color")]
    pub border_color: Rgba,
    #[serde(default = "default_border_width")]
    pub border_width: f64,
    #[serde(default = "default_legend_title")]
    pub legend_title: String,
    #[serde(default = "default_value_unit")]
    pub value_unit: String,
}

fn default_start_color() -> Rgba {
    Rgba::opaque(0xff, 0xed, 0xa0)
}

fn default_end_color() -> Rgba {
    Rgba::opaque(0xf0, 0x3b, 0x20)
}

fn default_border_color() -> Rgba {
    Rgba::opaque(0x33, 0x33, 0x33)
}

fn default_border_width() -> f64 {
    1.0
}

fn default_legend_title() -> String {
    "Población Total".to_owned()
}

fn default_value_unit() -> String {
    "habitantes".to_owned()
}

impl HeatmapConfig {
    pub fn ramp(&self) -> anyhow::Result<ColorRamp> {
        match &self.color_ramp {
            Some(colors) => ColorRamp::from_colors(colors.clone()),
            None => ColorRamp::linear(self.start_color, self.end_color, HEATMAP_RAMP_STEPS),
        }
    }

    fn feature_style(&self) -> PathStyle {
        PathStyle {
            fill: Rgba::TRANSPARENT,
            fill_opacity: 0.7,
            stroke: self.border_color,
            stroke_width: self.border_width,
            stroke_opacity: 1.0,
            dash_array: Some("3".to_owned()),
        }
    }
}

/// Min and max over the features whose value is a JSON number; both 0 when there are none.
pub fn value_range(features: &[Feature], column: &str) -> (f64, f64) {
    let mut values = features.iter().filter_map(|feature| feature.number(column));
    match values.next() {
        None => (0.0, 0.0),
        Some(first) => values.fold((first, first), |(min, max), value| {
            (min.min(value), max.max(value))
        }),
    }
}

#[derive(Debug, Clone)]
pub struct HeatmapLayer {
    pub features: Vec<Feature>,
    pub legend: Legend,
    pub extent: Option<Extent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeatmapDescription {
    pub layer: String,
    pub legend: Legend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[[f64; 2]; 2]>,
}

/// Color every feature by where its value falls on the ramp.
///
/// Features without a numeric value keep a transparent fill.
pub fn render_heatmap(
    collection: &FeatureCollection,
    config: &HeatmapConfig,
) -> anyhow::Result<HeatmapLayer> {
    let ramp = config.ramp()?;
    let (min, max) = value_range(&collection.features, &config.value_column);
    log::info!(
        "Heatmap of {} over {} features, values {} to {}",
        config.value_column,
        collection.len(),
        min,
        max
    );
    let base_style = config.feature_style();
    let features = collection
        .features
        .iter()
        .map(|feature| {
            let fill = feature
                .number(&config.value_column)
                .map_or(Rgba::TRANSPARENT, |value| {
                    ramp.color_for_value(value, min, max)
                });
            let tooltip = format!(
                "{}: {} {}",
                feature
                    .category(NAME_ATTRIBUTE)
                    .unwrap_or_else(|| "Municipio".to_owned()),
                display_value(feature, &config.value_column),
                config.value_unit
            );
            styled_feature(feature, &base_style.clone().with_fill(fill), Some(tooltip))
        })
        .collect();
    Ok(HeatmapLayer {
        features,
        legend: Legend::Gradient {
            title: config.legend_title.clone(),
            unit: Some(config.value_unit.clone()),
            min,
            max,
            colors: ramp.colors().to_vec(),
        },
        extent: Extent::of_geometries(collection.geometries()),
    })
}

impl HeatmapLayer {
    pub fn write(&self, output_dir: &Path, name: &str) -> anyhow::Result<HeatmapDescription> {
        let layer = format!("{}.geojson", name);
        write_features_to_geojson(&self.features, &output_dir.join(&layer))?;
        Ok(HeatmapDescription {
            layer,
            legend: self.legend.clone(),
            bounds: self.extent.map(|extent| extent.corners()),
        })
    }
}

#[cfg(test)]
mod tests {
    use geo::polygon;
    use rstest::rstest;
    use testdir::testdir;

    use super::{render_heatmap, value_range, HeatmapConfig};
    use crate::{
        color::{hex::Rgba, legend::Legend},
        geofile::{
            feature::{Feature, FeatureCollection},
            geojson::read_feature_collection,
        },
    };

    fn municipio(name: Option<&str>, population: serde_json::Value) -> Feature {
        let mut feature = Feature::from(geo::Geometry::Polygon(
            polygon![(x: -96.5, y: 16.8), (x: -96.4, y: 16.8), (x: -96.4, y: 16.9)],
        ));
        if let Some(name) = name {
            feature.set_attribute("NOMGEO", name);
        }
        feature.set_attribute("POB_TOTAL", population);
        feature
    }

    fn config() -> HeatmapConfig {
        serde_yaml::from_str("source: poblacion.geojson\nvalue_column: POB_TOTAL").unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = config();
        assert_eq!("#ffeda0", config.start_color.to_hex());
        assert_eq!("#f03b20", config.end_color.to_hex());
        assert_eq!("#333333", config.border_color.to_hex());
        assert_eq!(1.0, config.border_width);
        assert_eq!(10, config.ramp().unwrap().len());
    }

    #[rstest]
    #[case(vec![], (0.0, 0.0))]
    #[case(vec![serde_json::json!(5), serde_json::json!("90"), serde_json::json!(12.5)], (5.0, 12.5))]
    #[case(vec![serde_json::json!("a"), serde_json::json!(null)], (0.0, 0.0))]
    fn test_value_range_counts_numbers_only(
        #[case] values: Vec<serde_json::Value>,
        #[case] expected: (f64, f64),
    ) {
        let features: Vec<Feature> = values
            .into_iter()
            .map(|value| municipio(None, value))
            .collect();
        assert_eq!(expected, value_range(&features, "POB_TOTAL"));
    }

    #[test]
    fn test_render_heatmap_styles_features() {
        let collection = FeatureCollection::new(vec![
            municipio(Some("Tlacolula de Matamoros"), serde_json::json!(0)),
            municipio(Some("Mitla"), serde_json::json!(100)),
            municipio(None, serde_json::json!(50)),
            municipio(Some("Sin dato"), serde_json::json!("n/a")),
        ]);
        let layer = render_heatmap(&collection, &config()).unwrap();
        let fills: Vec<&str> = layer
            .features
            .iter()
            .map(|feature| feature.attributes["fill"].as_str().unwrap())
            .collect();
        assert_eq!(vec!["#ffeda0", "#f03b20", "#f78a59", "#00000000"], fills);
        assert_eq!(
            "Tlacolula de Matamoros: 0 habitantes",
            layer.features[0].attributes["tooltip"]
        );
        assert_eq!("Municipio: 50 habitantes", layer.features[2].attributes["tooltip"]);
        assert_eq!("3", layer.features[1].attributes["stroke-dasharray"]);
        assert_eq!(0.7, layer.features[1].attributes["fill-opacity"]);
        match &layer.legend {
            Legend::Gradient {
                unit, min, max, colors, ..
            } => {
                assert_eq!(Some("habitantes"), unit.as_deref());
                assert_eq!((0.0, 100.0), (*min, *max));
                assert_eq!(10, colors.len());
            }
            other => panic!("Unexpected legend {:?}", other),
        }
    }

    #[test]
    fn test_equal_values_take_first_ramp_color() {
        let collection = FeatureCollection::new(vec![
            municipio(Some("A"), serde_json::json!(7)),
            municipio(Some("B"), serde_json::json!(7)),
        ]);
        let mut config = config();
        config.color_ramp = Some(vec![Rgba::opaque(1, 2, 3), Rgba::opaque(4, 5, 6)]);
        let layer = render_heatmap(&collection, &config).unwrap();
        for feature in &layer.features {
            assert_eq!("#010203", feature.attributes["fill"]);
        }
    }

    #[test]
    fn test_write_heatmap() {
        let collection = FeatureCollection::new(vec![municipio(Some("Mitla"), serde_json::json!(1))]);
        let layer = render_heatmap(&collection, &config()).unwrap();
        let dir = testdir!();
        let description = layer.write(&dir, "poblacion").unwrap();
        assert_eq!("poblacion.geojson", description.layer);
        assert!(description.bounds.is_some());
        let written = read_feature_collection(&dir.join("poblacion.geojson")).unwrap();
        assert_eq!(1, written.len());
        assert_eq!("#ffeda0", written.features[0].attributes["fill"]);
    }
}
