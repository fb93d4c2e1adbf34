use std::cmp::Ordering;

use geo::Coord;

/// Z component of the cross product of `o->a` and `o->b`. Positive for a counter-clockwise turn.
pub fn cross_product(o: Coord, a: Coord, b: Coord) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Convex hull of a point set by Graham scan.
///
/// The pivot is the lowest point (smallest y, then smallest x). The remaining points are sorted by
/// polar angle around it and swept, discarding every point that does not make a strict left turn.
/// The returned ring is counter-clockwise and closed, i.e. its last point repeats the first.
///
/// Inputs with fewer than three points are returned unchanged.
pub fn convex_hull(points: &[Coord]) -> Vec<Coord> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let pivot_index = points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.y.partial_cmp(&b.y)
                .unwrap_or(Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
        })
        .map(|(index, _)| index)
        .unwrap_or(0);
    let pivot = points[pivot_index];

    let mut sorted: Vec<Coord> = points
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != pivot_index)
        .map(|(_, point)| *point)
        .collect();
    let angle = |p: &Coord| (p.y - pivot.y).atan2(p.x - pivot.x);
    let distance = |p: &Coord| (p.x - pivot.x).powi(2) + (p.y - pivot.y).powi(2);
    // Collinear points are ordered nearest first so the sweep keeps the farthest one.
    sorted.sort_by(|a, b| {
        angle(a)
            .partial_cmp(&angle(b))
            .unwrap_or(Ordering::Equal)
            .then(distance(a).partial_cmp(&distance(b)).unwrap_or(Ordering::Equal))
    });

    let mut hull = vec![pivot];
    for point in sorted {
        while hull.len() > 1 && cross_product(hull[hull.len() - 2], hull[hull.len() - 1], point) <= 0.0
        {
            hull.pop();
        }
        hull.push(point);
    }
    hull.push(pivot);
    hull
}
