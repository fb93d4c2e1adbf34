use std::{fs, path::Path};

use anyhow::{anyhow, Context};

use super::{
    feature::{Feature, FeatureCollection},
    source::DataSource,
};

/// Parse a GeoJSON document into features. Features without a geometry, or with a geometry
/// that cannot be represented, are skipped with a warning.
pub fn parse_feature_collection(contents: &str) -> anyhow::Result<FeatureCollection> {
    let geojson: geojson::GeoJson = contents
        .parse()
        .map_err(|err| anyhow!("Malformed GeoJSON: {}", err))?;
    let raw_features = match geojson {
        geojson::GeoJson::FeatureCollection(collection) => collection.features,
        geojson::GeoJson::Feature(feature) => vec![feature],
        geojson::GeoJson::Geometry(geometry) => vec![geojson::Feature::from(geometry)],
    };

    let num_features = raw_features.len();
    let features: Vec<Feature> = raw_features
        .into_iter()
        .filter_map(|feature| {
            let geometry = feature.geometry?;
            match geo::Geometry::<f64>::try_from(geometry.value) {
                Ok(geometry) => Some(Feature::new(
                    geometry,
                    feature.properties.unwrap_or_default(),
                )),
                Err(err) => {
                    log::warn!("Skipping feature with unsupported geometry: {}", err);
                    None
                }
            }
        })
        .collect();
    if features.len() != num_features {
        log::warn!(
            "Out of {} features read, only {} had usable geometries.",
            num_features,
            features.len()
        )
    }
    Ok(FeatureCollection::new(features))
}

pub fn read_feature_collection(filepath: &Path) -> anyhow::Result<FeatureCollection> {
    let contents =
        fs::read_to_string(filepath).with_context(|| format!("Reading {:?}", filepath))?;
    parse_feature_collection(&contents).with_context(|| format!("Parsing {:?}", filepath))
}

/// Fetch (or reuse the cached copy of) a GeoJSON source and parse it.
pub fn load_feature_collection(
    source: &DataSource,
    data_dir: &Path,
) -> anyhow::Result<FeatureCollection> {
    let filepath = source.sync_to_file(data_dir)?;
    let collection = read_feature_collection(&filepath)?;
    log::info!("Read {} features from {:?}", collection.len(), filepath);
    Ok(collection)
}

pub fn to_geojson(features: &[Feature]) -> geojson::GeoJson {
    let feature_collection: geojson::FeatureCollection = features
        .iter()
        .map(|feature| geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&feature.geometry))),
            id: None,
            properties: Some(feature.attributes.clone()),
            foreign_members: None,
        })
        .collect();
    geojson::GeoJson::from(feature_collection)
}

pub fn write_features_to_geojson(features: &[Feature], output_filepath: &Path) -> anyhow::Result<()> {
    log::debug!(
        "Writing {} features to {:?}",
        features.len(),
        output_filepath
    );
    fs::write(output_filepath, to_geojson(features).to_string())
        .with_context(|| format!("Writing {:?}", output_filepath))
}
