use std::collections::BTreeMap;

use geojson::{JsonObject, JsonValue};

#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: geo::Geometry,
    pub attributes: JsonObject,
}

impl From<geo::Geometry> for Feature {
    fn from(value: geo::Geometry) -> Self {
        Self {
            geometry: value,
            attributes: JsonObject::new(),
        }
    }
}

impl Feature {
    pub fn new(geometry: geo::Geometry, attributes: JsonObject) -> Self {
        Self {
            geometry,
            attributes,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&JsonValue> {
        match self.attributes.get(key) {
            Some(JsonValue::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    /// Numeric attribute. Only JSON numbers count; strings are ignored.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.attribute(key).and_then(JsonValue::as_f64)
    }

    /// Numeric attribute that also accepts numeric strings, reading the leading number
    /// the way `parseFloat` does ("12.5 ha" is 12.5).
    pub fn lenient_number(&self, key: &str) -> Option<f64> {
        match self.attribute(key)? {
            JsonValue::Number(number) => number.as_f64(),
            JsonValue::String(text) => parse_leading_float(text),
            _ => None,
        }
    }

    /// Numeric attribute that also accepts strings holding a single number and nothing else,
    /// surrounding whitespace aside (" 80 " is 80, "12 ha" is `None`).
    pub fn exact_number(&self, key: &str) -> Option<f64> {
        match self.attribute(key)? {
            JsonValue::Number(number) => number.as_f64(),
            JsonValue::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|value| value.is_finite())
    }

    /// Area attribute in hectares. Missing or unparsable values count as zero.
    pub fn hectares(&self, key: &str) -> f64 {
        self.lenient_number(key)
            .filter(|value| value.is_finite())
            .unwrap_or(0.0)
    }

    /// Attribute rendered as a category label: strings verbatim, other values in their JSON form.
    pub fn category(&self, key: &str) -> Option<String> {
        match self.attribute(key)? {
            JsonValue::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn set_attribute(&mut self, key: &str, value: impl Into<JsonValue>) {
        self.attributes.insert(key.to_owned(), value.into());
    }
}

fn parse_leading_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exponent = false;
    let bytes = text.as_bytes();
    while end < bytes.len() {
        let byte = bytes[end];
        match byte {
            b'0'..=b'9' => seen_digit = true,
            b'+' | b'-' if end == 0 => {}
            b'+' | b'-' if seen_exponent && matches!(bytes[end - 1], b'e' | b'E') => {}
            b'.' if !seen_dot && !seen_exponent => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exponent => seen_exponent = true,
            _ => break,
        }
        end += 1;
    }
    // Trim a dangling exponent or sign so "12e" parses as 12.
    let mut candidate = &text[..end];
    while !candidate.is_empty() {
        if let Ok(value) = candidate.parse::<f64>() {
            return Some(value);
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    None
}

/// A loaded GeoJSON document: every feature that carried a geometry, in document order.
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn geometries(&self) -> impl Iterator<Item = &geo::Geometry> {
        self.features.iter().map(|feature| &feature.geometry)
    }

    /// Distinct values of a category attribute in first-appearance order.
    pub fn distinct_categories(&self, key: &str) -> Vec<String> {
        distinct_categories(self.features.iter(), key)
    }

    /// Features grouped by a category attribute. Features without the attribute are grouped
    /// under the empty string.
    pub fn group_by(&self, key: &str) -> BTreeMap<String, Vec<&Feature>> {
        let mut groups: BTreeMap<String, Vec<&Feature>> = BTreeMap::new();
        for feature in &self.features {
            groups
                .entry(feature.category(key).unwrap_or_default())
                .or_default()
                .push(feature);
        }
        groups
    }

    pub fn filter_by<'a>(&'a self, key: &'a str, value: &'a str) -> impl Iterator<Item = &'a Feature> {
        self.features
            .iter()
            .filter(move |feature| feature.category(key).as_deref() == Some(value))
    }
}

pub fn distinct_categories<'a, I>(features: I, key: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a Feature>,
{
    let mut seen = std::collections::HashSet::new();
    features
        .into_iter()
        .filter_map(|feature| feature.category(key))
        .filter(|category| seen.insert(category.clone()))
        .collect()
}
