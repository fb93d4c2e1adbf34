use std::collections::BTreeMap;

use geo::{Area, Coord, LineString, Polygon};

use super::{extent::Extent, hull::convex_hull};
use crate::geofile::feature::FeatureCollection;

/// Buffer used around envelope borders when none is configured, in degrees.
pub const DEFAULT_ENVELOPE_BUFFER: f64 = 0.001;

/// Vertices of the exterior ring of every polygon. Other geometry types contribute nothing.
pub fn exterior_vertices<'a, I>(geometries: I) -> Vec<Coord>
where
    I: IntoIterator<Item = &'a geo::Geometry>,
{
    let mut vertices = Vec::new();
    for geometry in geometries {
        match geometry {
            geo::Geometry::Polygon(polygon) => vertices.extend(polygon.exterior().coords()),
            geo::Geometry::MultiPolygon(multi_polygon) => {
                for polygon in multi_polygon {
                    vertices.extend(polygon.exterior().coords());
                }
            }
            _ => {}
        }
    }
    vertices
}

/// Approximate the union of the given polygons by the convex hull of their exterior vertices.
///
/// This overestimates the area of non-convex unions and is only meant for drawing an aggregate
/// outline. Returns None when there are no polygon vertices.
pub fn approximate_union<'a, I>(geometries: I) -> Option<Polygon>
where
    I: IntoIterator<Item = &'a geo::Geometry>,
{
    let vertices = exterior_vertices(geometries);
    if vertices.is_empty() {
        return None;
    }
    Some(Polygon::new(LineString::from(convex_hull(&vertices)), vec![]))
}

/// Outline drawn around a set of polygons: their approximate union, or the buffered envelope
/// when the vertices do not enclose any area.
pub fn border_outline(geometries: &[&geo::Geometry]) -> Option<Polygon> {
    let union = approximate_union(geometries.iter().copied())?;
    if union.unsigned_area() > 0.0 {
        return Some(union);
    }
    log::debug!("Degenerate union, falling back to a buffered envelope");
    buffered_envelope(geometries.iter().copied(), DEFAULT_ENVELOPE_BUFFER)
}

/// One border outline per distinct value of `key`.
pub fn grouped_unions(collection: &FeatureCollection, key: &str) -> BTreeMap<String, Polygon> {
    collection
        .group_by(key)
        .into_iter()
        .filter_map(|(group, features)| {
            let geometries: Vec<&geo::Geometry> =
                features.iter().map(|feature| &feature.geometry).collect();
            match border_outline(&geometries) {
                Some(outline) => Some((group, outline)),
                None => {
                    log::warn!("Could not build a border for group '{}'", group);
                    None
                }
            }
        })
        .collect()
}

/// Bounding rectangle of all exterior vertices, grown by `buffer` on every side.
pub fn buffered_envelope<'a, I>(geometries: I, buffer: f64) -> Option<Polygon>
where
    I: IntoIterator<Item = &'a geo::Geometry>,
{
    let vertices = exterior_vertices(geometries);
    let first = vertices.first()?;
    let extent = vertices.iter().fold(
        Extent::new(first.x, first.y, first.x, first.y),
        |extent, coord| extent.union(&Extent::new(coord.x, coord.y, coord.x, coord.y)),
    );
    Some(extent.padded(buffer).to_polygon())
}
