use geo::BoundingRect;
use serde::Serialize;

/// Axis-aligned geographic extent, x being longitude and y latitude for EPSG:4326 data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn from_rect(rect: geo::Rect) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }

    /// Extent covering every geometry, or None if there are no coordinates.
    pub fn of_geometries<'a, I>(geometries: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a geo::Geometry>,
    {
        geometries
            .into_iter()
            .filter_map(|geometry| geometry.bounding_rect())
            .map(Self::from_rect)
            .reduce(|a, b| a.union(&b))
    }

    pub fn union(&self, other: &Extent) -> Extent {
        Extent::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Grow the extent by `padding` on every side.
    pub fn padded(&self, padding: f64) -> Extent {
        Extent::new(
            self.min_x - padding,
            self.min_y - padding,
            self.max_x + padding,
            self.max_y + padding,
        )
    }

    pub fn is_finite(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|value| value.is_finite())
    }

    /// South-west and north-east corners as `[lat, lon]` pairs, the order web map image overlays expect.
    pub fn corners(&self) -> [[f64; 2]; 2] {
        [[self.min_y, self.min_x], [self.max_y, self.max_x]]
    }

    pub fn to_polygon(&self) -> geo::Polygon {
        geo::Rect::new(
            geo::Coord {
                x: self.min_x,
                y: self.min_y,
            },
            geo::Coord {
                x: self.max_x,
                y: self.max_y,
            },
        )
        .to_polygon()
    }
}
