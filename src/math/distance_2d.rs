use super::{Point2, Vector2};

/// Returns the minimum distance from `point` to the finite segment `a`-`b`.
#[must_use]
pub fn point_to_segment_distance(point: &Point2, a: &Point2, b: &Point2) -> f64 {
    let d = b - a;
    let len_sq = d.norm_squared();

    if len_sq < 1e-20 {
        // Degenerate segment (zero length).
        return (point - a).norm();
    }

    // Project point onto the infinite line, clamp to [0, 1].
    let t = ((point - a).dot(&d) / len_sq).clamp(0.0, 1.0);
    let closest = a + d * t;
    (point - closest).norm()
}

/// Returns the perpendicular distance from `point` to the infinite line
/// through `a` and `b`, or the point distance to `a` if they coincide.
#[must_use]
pub fn point_to_line_distance(point: &Point2, a: &Point2, b: &Point2) -> f64 {
    let d: Vector2 = b - a;
    let len = d.norm();
    if len < 1e-10 {
        return (point - a).norm();
    }
    super::cross_2d(&d, &(point - a)).abs() / len
}

/// Smallest distance between any endpoint of one segment and any endpoint of
/// the other.
#[must_use]
pub fn min_endpoint_distance(a1: &Point2, a2: &Point2, b1: &Point2, b2: &Point2) -> f64 {
    [(a1, b1), (a1, b2), (a2, b1), (a2, b2)]
        .iter()
        .map(|(p, q)| nalgebra::distance(*p, *q))
        .fold(f64::INFINITY, f64::min)
}
