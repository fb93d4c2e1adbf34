use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Serialize};

use super::style::{border_feature, display_value, styled_feature, PathStyle};
use crate::{
    color::{
        hex::Rgba,
        legend::Legend,
        palette::{OrdinalScale, Palette},
    },
    geofile::{
        feature::{distinct_categories, Feature, FeatureCollection},
        geojson::write_features_to_geojson,
    },
    geometry::{
        extent::Extent,
        union::{border_outline, grouped_unions},
    },
};

/// Attribute used to group features before summarising or outlining them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Delimitation {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "PAISAJE")]
    Landscape,
    #[serde(rename = "RM")]
    Region,
    #[serde(rename = "NOMGEO")]
    Municipality,
}

impl Delimitation {
    /// Feature attribute holding the group value; None for the whole study area.
    pub fn attribute(&self) -> Option<&'static str> {
        match self {
            Delimitation::All => None,
            Delimitation::Landscape => Some("PAISAJE"),
            Delimitation::Region => Some("RM"),
            Delimitation::Municipality => Some("NOMGEO"),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Delimitation::All => "Área de Estudio",
            Delimitation::Landscape => "Paisaje",
            Delimitation::Region => "Región",
            Delimitation::Municipality => "Municipio",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChoroplethConfig {
    pub source: String,
    #[serde(default = "default_category_column")]
    pub category_column: String,
    #[serde(default = "default_hectares_column")]
    pub hectares_column: String,
    #[serde(default)]
    pub palette: Palette,
    #[serde(default)]
    pub delimitation: Delimitation,
    /// Group value to highlight. Ignored when the delimitation is `all`.
    #[serde(default)]
    pub selected: Option<String>,
    #[serde(default)]
    pub exterior_border: bool,
    #[serde(default)]
    pub group_borders: bool,
}

fn default_category_column() -> String {
    "CLIMA".to_owned()
}

fn default_hectares_column() -> String {
    "HECTARES".to_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummarySlice {
    pub label: String,
    pub hectares: f64,
    /// Share of the total, rounded to a whole percent.
    pub percent: i64,
    pub color: Rgba,
}

/// Hectares per label, as drawn in the section's pie chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HectareSummary {
    pub title: String,
    pub total: f64,
    pub slices: Vec<SummarySlice>,
}

/// Sum hectares per label in first-appearance order.
fn sum_by_label<'a, I, F>(features: I, hectares_column: &str, label: F) -> Vec<(String, f64)>
where
    I: IntoIterator<Item = &'a Feature>,
    F: Fn(&Feature) -> String,
{
    let mut order: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for feature in features {
        let key = label(feature);
        let hectares = feature.hectares(hectares_column);
        match index.get(&key) {
            Some(position) => order[*position].1 += hectares,
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, hectares));
            }
        }
    }
    order
}

fn to_summary<F>(title: String, sums: Vec<(String, f64)>, color: F) -> HectareSummary
where
    F: Fn(&str) -> Rgba,
{
    let total: f64 = sums.iter().map(|(_, hectares)| hectares).sum();
    let slices = sums
        .into_iter()
        .map(|(label, hectares)| SummarySlice {
            percent: if total > 0.0 {
                (hectares / total * 100.0).round() as i64
            } else {
                0
            },
            color: color(&label),
            label,
            hectares,
        })
        .collect();
    HectareSummary {
        title,
        total,
        slices,
    }
}

/// Styled features of a categorical map plus everything drawn around them.
#[derive(Debug, Clone)]
pub struct ChoroplethLayer {
    pub features: Vec<Feature>,
    pub borders: Vec<Feature>,
    pub legend: Legend,
    pub summary: HectareSummary,
    pub extent: Option<Extent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoroplethDescription {
    pub layer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borders: Option<String>,
    pub legend: Legend,
    pub summary: HectareSummary,
    pub delimitation: Delimitation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    /// Group values a reader can pick from.
    pub groups: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[[f64; 2]; 2]>,
}

pub struct ChoroplethRenderer<'a> {
    collection: &'a FeatureCollection,
    config: &'a ChoroplethConfig,
    category_scale: OrdinalScale,
}

impl<'a> ChoroplethRenderer<'a> {
    pub fn new(collection: &'a FeatureCollection, config: &'a ChoroplethConfig) -> Self {
        let category_scale = OrdinalScale::with_domain(
            config.palette,
            collection.distinct_categories(&config.category_column),
        );
        Self {
            collection,
            config,
            category_scale,
        }
    }

    /// The grouping attribute together with the selected group, when both apply.
    fn selection(&self) -> Option<(&'static str, &str)> {
        let attribute = self.config.delimitation.attribute()?;
        let selected = self.config.selected.as_deref()?;
        Some((attribute, selected))
    }

    fn category_color(&self, feature: &Feature) -> Rgba {
        feature
            .category(&self.config.category_column)
            .and_then(|category| self.category_scale.get(&category))
            .unwrap_or(Rgba::TRANSPARENT)
    }

    fn feature_style(&self, feature: &Feature) -> PathStyle {
        let base = PathStyle {
            fill: Rgba::TRANSPARENT,
            fill_opacity: 0.7,
            stroke: Rgba::opaque(0xff, 0xff, 0xff),
            stroke_width: 0.5,
            stroke_opacity: 0.3,
            dash_array: None,
        };
        match self.selection() {
            Some((attribute, selected))
                if feature.category(attribute).as_deref() != Some(selected) =>
            {
                PathStyle::outline(Rgba::opaque(0xcc, 0xcc, 0xcc), 0.3, 0.5, None)
            }
            _ => base.with_fill(self.category_color(feature)),
        }
    }

    fn tooltip(&self, feature: &Feature) -> String {
        let mut tooltip = format!(
            "{}\n{}: {}\nHectáreas: {}",
            feature
                .category("NOMGEO")
                .unwrap_or_else(|| "Sin nombre".to_owned()),
            self.config.category_column,
            display_value(feature, &self.config.category_column),
            feature.hectares(&self.config.hectares_column)
        );
        if let Some(attribute) = self.config.delimitation.attribute() {
            tooltip.push_str(&format!(
                "\n{}: {}",
                attribute,
                display_value(feature, attribute)
            ));
        }
        tooltip
    }

    pub fn chart_title(&self) -> String {
        match (self.selection(), self.config.delimitation) {
            (Some((_, selected)), _) => format!(
                "Distribución de {} en {} (ha)",
                self.config.category_column, selected
            ),
            (None, Delimitation::All) => format!(
                "Distribución de {} en Área de Estudio (ha)",
                self.config.category_column
            ),
            (None, delimitation) => format!(
                "Distribución de Hectáreas por {} (ha)",
                delimitation.label()
            ),
        }
    }

    /// Hectares per category over the whole area, per group value when grouped without a
    /// selection, or per category within the selected group.
    pub fn summary(&self) -> HectareSummary {
        let hectares_column = &self.config.hectares_column;
        let category_label = |feature: &Feature| {
            feature
                .category(&self.config.category_column)
                .unwrap_or_default()
        };
        let category_color = |label: &str| {
            self.category_scale
                .get(label)
                .unwrap_or(Rgba::TRANSPARENT)
        };
        match (self.config.delimitation.attribute(), self.selection()) {
            (_, Some((attribute, selected))) => {
                let sums = sum_by_label(
                    self.collection.filter_by(attribute, selected),
                    hectares_column,
                    category_label,
                );
                to_summary(self.chart_title(), sums, category_color)
            }
            (Some(attribute), None) => {
                let sums = sum_by_label(&self.collection.features, hectares_column, |feature| {
                    feature.category(attribute).unwrap_or_default()
                });
                let group_scale = OrdinalScale::with_domain(
                    self.config.palette,
                    sums.iter().map(|(label, _)| label.as_str()),
                );
                to_summary(self.chart_title(), sums, |label| {
                    group_scale.get(label).unwrap_or(Rgba::TRANSPARENT)
                })
            }
            (None, None) => {
                let sums = sum_by_label(&self.collection.features, hectares_column, category_label);
                to_summary(self.chart_title(), sums, category_color)
            }
        }
    }

    pub fn borders(&self) -> Vec<Feature> {
        let mut borders = Vec::new();
        if self.config.exterior_border {
            let geometries: Vec<&geo::Geometry> = self.collection.geometries().collect();
            match border_outline(&geometries) {
                Some(exterior) => borders.push(border_feature(
                    exterior,
                    &PathStyle::outline(Rgba::opaque(0, 0, 0), 4.0, 1.0, None),
                    None,
                )),
                None => log::warn!("Could not build the exterior border"),
            }
        }
        if let (true, Some(attribute)) = (
            self.config.group_borders,
            self.config.delimitation.attribute(),
        ) {
            let style = PathStyle::outline(Rgba::opaque(0xff, 0, 0), 3.0, 0.8, Some("10, 5"));
            let unions = grouped_unions(self.collection, attribute);
            log::info!("Built {} group borders by {}", unions.len(), attribute);
            borders.extend(
                unions
                    .into_iter()
                    .map(|(group, polygon)| border_feature(polygon, &style, Some(&group))),
            );
        }
        borders
    }

    /// Bounds of the selected group, or of every feature without a selection.
    pub fn extent(&self) -> Option<Extent> {
        match self.selection() {
            Some((attribute, selected)) => Extent::of_geometries(
                self.collection
                    .filter_by(attribute, selected)
                    .map(|feature| &feature.geometry),
            ),
            None => Extent::of_geometries(self.collection.geometries()),
        }
    }

    pub fn render(&self) -> ChoroplethLayer {
        if self.config.selected.is_some() && self.config.delimitation == Delimitation::All {
            log::warn!("Ignoring the selected group, the map is not delimited");
        }
        let features = self
            .collection
            .features
            .iter()
            .map(|feature| {
                styled_feature(
                    feature,
                    &self.feature_style(feature),
                    Some(self.tooltip(feature)),
                )
            })
            .collect();
        ChoroplethLayer {
            features,
            borders: self.borders(),
            legend: Legend::from_ordinal_scale(&self.config.category_column, &self.category_scale),
            summary: self.summary(),
            extent: self.extent(),
        }
    }
}

pub fn render_choropleth(collection: &FeatureCollection, config: &ChoroplethConfig) -> ChoroplethLayer {
    ChoroplethRenderer::new(collection, config).render()
}

impl ChoroplethLayer {
    pub fn write(
        &self,
        output_dir: &Path,
        name: &str,
        config: &ChoroplethConfig,
        collection: &FeatureCollection,
    ) -> anyhow::Result<ChoroplethDescription> {
        let layer = format!("{}.geojson", name);
        write_features_to_geojson(&self.features, &output_dir.join(&layer))?;
        let borders = if self.borders.is_empty() {
            None
        } else {
            let borders = format!("{}_borders.geojson", name);
            write_features_to_geojson(&self.borders, &output_dir.join(&borders))?;
            Some(borders)
        };
        let groups = match config.delimitation.attribute() {
            Some(attribute) => distinct_categories(&collection.features, attribute),
            None => Vec::new(),
        };
        Ok(ChoroplethDescription {
            layer,
            borders,
            legend: self.legend.clone(),
            summary: self.summary.clone(),
            delimitation: config.delimitation,
            selected: config
                .delimitation
                .attribute()
                .and(config.selected.clone()),
            groups,
            bounds: self.extent.map(|extent| extent.corners()),
        })
    }
}
