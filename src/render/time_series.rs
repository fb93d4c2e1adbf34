use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Serialize};

use super::style::{styled_feature, PathStyle};
use crate::{
    color::{
        hex::Rgba,
        legend::{Legend, LegendEntry},
    },
    geofile::{
        feature::{distinct_categories, Feature, FeatureCollection},
        geojson::write_features_to_geojson,
    },
    geometry::extent::Extent,
};

/// Change-type attribute of each period, with the year the period ends in.
pub const PERIODS: [(&str, u16); 7] = [
    ("S0_S1", 1980),
    ("S1_S2", 1990),
    ("S2_S3", 2000),
    ("S3_S4", 2004),
    ("S4_S5", 2007),
    ("S5_S6", 2011),
    ("S6_S7", 2018),
];

const LANDSCAPE_ATTRIBUTE: &str = "PAISAJE";
const MUNICIPALITY_ATTRIBUTE: &str = "NOMGEO";
const HECTARES_ATTRIBUTE: &str = "HECTARES";

const CHANGE_COLORS: [(&str, Rgba); 4] = [
    ("Deforestación", Rgba::opaque(0xff, 0x00, 0x00)),
    ("Revegetación", Rgba::opaque(0x90, 0xee, 0x90)),
    ("Permanencia antrópica", Rgba::opaque(0xff, 0xff, 0x00)),
    ("Permanencia vegetación", Rgba::opaque(0x00, 0x64, 0x00)),
];

const UNKNOWN_CHANGE_COLOR: Rgba = Rgba::opaque(0xcc, 0xcc, 0xcc);

pub fn change_color(change_type: Option<&str>) -> Rgba {
    CHANGE_COLORS
        .iter()
        .find(|(name, _)| Some(*name) == change_type)
        .map_or(UNKNOWN_CHANGE_COLOR, |(_, color)| *color)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    #[default]
    Area,
    Paisaje,
    Municipio,
}

impl Scale {
    fn attribute(&self) -> Option<&'static str> {
        match self {
            Scale::Area => None,
            Scale::Paisaje => Some(LANDSCAPE_ATTRIBUTE),
            Scale::Municipio => Some(MUNICIPALITY_ATTRIBUTE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeSeriesConfig {
    pub source: String,
    #[serde(default)]
    pub scale: Scale,
    /// Landscape or municipality to focus on, depending on the scale.
    #[serde(default)]
    pub selected: Option<String>,
}

impl TimeSeriesConfig {
    fn selection(&self) -> Option<(&'static str, &str)> {
        Some((self.scale.attribute()?, self.selected.as_deref()?))
    }
}

/// Features shown at the configured scale: those of the selected landscape or municipality,
/// or all of them.
pub fn filtered_features<'a>(
    collection: &'a FeatureCollection,
    config: &TimeSeriesConfig,
) -> Vec<&'a Feature> {
    match config.selection() {
        Some((attribute, selected)) => collection
            .features
            .iter()
            .filter(|feature| feature.category(attribute).as_deref() == Some(selected))
            .collect(),
        None => collection.features.iter().collect(),
    }
}

pub fn landscapes(collection: &FeatureCollection) -> Vec<String> {
    collection.distinct_categories(LANDSCAPE_ATTRIBUTE)
}

pub fn municipalities_in(collection: &FeatureCollection, landscape: &str) -> Vec<String> {
    distinct_categories(
        collection.filter_by(LANDSCAPE_ATTRIBUTE, landscape),
        MUNICIPALITY_ATTRIBUTE,
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeTotal {
    pub change_type: String,
    pub hectares: f64,
}

/// Hectares per change type in one period, in first-appearance order. Features without a
/// change type for the period are left out; hectares that are not a plain number count as 0.
pub fn hectares_by_change_type(features: &[&Feature], period_key: &str) -> Vec<ChangeTotal> {
    let mut totals: Vec<ChangeTotal> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for feature in features {
        let change_type = match feature.category(period_key) {
            Some(change_type) if !change_type.is_empty() => change_type,
            _ => continue,
        };
        let hectares = feature.exact_number(HECTARES_ATTRIBUTE).unwrap_or(0.0);
        match index.get(&change_type) {
            Some(position) => totals[*position].hectares += hectares,
            None => {
                index.insert(change_type.clone(), totals.len());
                totals.push(ChangeTotal {
                    change_type,
                    hectares,
                });
            }
        }
    }
    totals
}

#[derive(Debug, Clone)]
pub struct PeriodLayer {
    pub key: &'static str,
    pub year: u16,
    pub features: Vec<Feature>,
    pub totals: Vec<ChangeTotal>,
}

#[derive(Debug, Clone)]
pub struct TimeSeriesLayers {
    pub periods: Vec<PeriodLayer>,
    pub legend: Legend,
    pub landscapes: Vec<String>,
    pub municipalities: Vec<(String, Vec<String>)>,
    pub extent: Option<Extent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodDescription {
    pub key: &'static str,
    pub year: u16,
    pub layer: String,
    pub totals: Vec<ChangeTotal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeSeriesDescription {
    pub scale: Scale,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    pub periods: Vec<PeriodDescription>,
    pub legend: Legend,
    pub landscapes: Vec<String>,
    /// Municipalities of each landscape.
    pub municipalities: Vec<(String, Vec<String>)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[[f64; 2]; 2]>,
}

fn change_legend() -> Legend {
    Legend::Categories {
        title: "Tipo de cambio".to_owned(),
        entries: CHANGE_COLORS
            .iter()
            .map(|(name, color)| LegendEntry {
                label: (*name).to_owned(),
                color: *color,
            })
            .collect(),
    }
}

/// One styled layer per period, colored by the change type recorded for that period.
pub fn render_time_series(collection: &FeatureCollection, config: &TimeSeriesConfig) -> TimeSeriesLayers {
    let features = filtered_features(collection, config);
    log::info!(
        "Land use change over {} of {} features",
        features.len(),
        collection.len()
    );
    let base_style = PathStyle {
        fill: UNKNOWN_CHANGE_COLOR,
        fill_opacity: 0.7,
        stroke: Rgba::opaque(0x55, 0x55, 0x55),
        stroke_width: 1.0,
        stroke_opacity: 1.0,
        dash_array: None,
    };
    let selected_style = PathStyle {
        stroke: Rgba::opaque(0, 0, 0),
        fill_opacity: 0.9,
        ..base_style.clone()
    };
    let style = if config.selection().is_some() {
        selected_style
    } else {
        base_style
    };

    let periods = PERIODS
        .iter()
        .map(|&(key, year)| PeriodLayer {
            key,
            year,
            features: features
                .iter()
                .map(|feature| {
                    let change_type = feature.category(key);
                    let tooltip = format!(
                        "{}\n{}: {}",
                        feature
                            .category(MUNICIPALITY_ATTRIBUTE)
                            .unwrap_or_else(|| "Sin nombre".to_owned()),
                        year,
                        change_type.as_deref().unwrap_or("Sin dato")
                    );
                    styled_feature(
                        feature,
                        &style.clone().with_fill(change_color(change_type.as_deref())),
                        Some(tooltip),
                    )
                })
                .collect(),
            totals: hectares_by_change_type(&features, key),
        })
        .collect();

    let landscapes = landscapes(collection);
    let municipalities = landscapes
        .iter()
        .map(|landscape| (landscape.clone(), municipalities_in(collection, landscape)))
        .collect();
    TimeSeriesLayers {
        periods,
        legend: change_legend(),
        landscapes,
        municipalities,
        extent: Extent::of_geometries(features.iter().map(|feature| &feature.geometry)),
    }
}

impl TimeSeriesLayers {
    /// Write each period as `<name>_<period>.geojson`.
    pub fn write(
        &self,
        output_dir: &Path,
        name: &str,
        config: &TimeSeriesConfig,
    ) -> anyhow::Result<TimeSeriesDescription> {
        let mut periods = Vec::with_capacity(self.periods.len());
        for period in &self.periods {
            let layer = format!("{}_{}.geojson", name, period.key);
            write_features_to_geojson(&period.features, &output_dir.join(&layer))?;
            periods.push(PeriodDescription {
                key: period.key,
                year: period.year,
                layer,
                totals: period.totals.clone(),
            });
        }
        Ok(TimeSeriesDescription {
            scale: config.scale,
            selected: config.selection().map(|(_, selected)| selected.to_owned()),
            periods,
            legend: self.legend.clone(),
            landscapes: self.landscapes.clone(),
            municipalities: self.municipalities.clone(),
            bounds: self.extent.map(|extent| extent.corners()),
        })
    }
}
