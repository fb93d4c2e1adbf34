use geojson::JsonValue;

use crate::{color::hex::Rgba, geofile::feature::Feature};

pub const FILL: &str = "fill";
pub const FILL_OPACITY: &str = "fill-opacity";
pub const STROKE: &str = "stroke";
pub const STROKE_WIDTH: &str = "stroke-width";
pub const STROKE_OPACITY: &str = "stroke-opacity";
pub const STROKE_DASHARRAY: &str = "stroke-dasharray";
pub const TOOLTIP: &str = "tooltip";

/// How a polygon or line is drawn, written into feature properties using the simplestyle
/// names web maps understand.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStyle {
    pub fill: Rgba,
    pub fill_opacity: f64,
    pub stroke: Rgba,
    pub stroke_width: f64,
    pub stroke_opacity: f64,
    pub dash_array: Option<String>,
}

impl PathStyle {
    /// A border with nothing filled in.
    pub fn outline(stroke: Rgba, stroke_width: f64, stroke_opacity: f64, dash_array: Option<&str>) -> Self {
        Self {
            fill: Rgba::TRANSPARENT,
            fill_opacity: 0.0,
            stroke,
            stroke_width,
            stroke_opacity,
            dash_array: dash_array.map(str::to_owned),
        }
    }

    pub fn with_fill(mut self, fill: Rgba) -> Self {
        self.fill = fill;
        self
    }

    pub fn apply(&self, feature: &mut Feature) {
        feature.set_attribute(FILL, self.fill.to_hex());
        feature.set_attribute(FILL_OPACITY, self.fill_opacity);
        feature.set_attribute(STROKE, self.stroke.to_hex());
        feature.set_attribute(STROKE_WIDTH, self.stroke_width);
        feature.set_attribute(STROKE_OPACITY, self.stroke_opacity);
        match &self.dash_array {
            Some(dash_array) => feature.set_attribute(STROKE_DASHARRAY, dash_array.as_str()),
            None => {
                feature.attributes.remove(STROKE_DASHARRAY);
            }
        }
    }
}

/// Copy of `feature` carrying `style` and, when given, a tooltip.
pub fn styled_feature(feature: &Feature, style: &PathStyle, tooltip: Option<String>) -> Feature {
    let mut styled = feature.clone();
    style.apply(&mut styled);
    if let Some(tooltip) = tooltip {
        styled.set_attribute(TOOLTIP, tooltip);
    }
    styled
}

/// A border polygon as a feature, optionally naming the group it outlines.
pub fn border_feature(polygon: geo::Polygon, style: &PathStyle, group: Option<&str>) -> Feature {
    let mut feature = Feature::from(geo::Geometry::Polygon(polygon));
    style.apply(&mut feature);
    if let Some(group) = group {
        feature.set_attribute("group", group);
    }
    feature
}

/// Text of an attribute for display: strings verbatim, numbers and other values in their
/// JSON form, empty when absent.
pub fn display_value(feature: &Feature, key: &str) -> String {
    match feature.attribute(key) {
        Some(JsonValue::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
