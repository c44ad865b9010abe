use super::{Point2, EPSILON};

/// Intersection of the infinite lines through `(p1, p2)` and `(p3, p4)`.
///
/// Returns `None` when the lines are parallel or nearly so. The hit may lie
/// outside both segments; callers test membership with [`is_point_on_segment`].
#[must_use]
pub fn line_intersection(p1: &Point2, p2: &Point2, p3: &Point2, p4: &Point2) -> Option<Point2> {
    let det = (p1.x - p2.x) * (p3.y - p4.y) - (p1.y - p2.y) * (p3.x - p4.x);
    if det.abs() < EPSILON {
        return None;
    }
    let t = ((p1.x - p3.x) * (p3.y - p4.y) - (p1.y - p3.y) * (p3.x - p4.x)) / det;
    Some(Point2::new(
        p1.x + t * (p2.x - p1.x),
        p1.y + t * (p2.y - p1.y),
    ))
}

/// Bounding-box membership test of `point` against segment `a`-`b`, with the
/// box expanded by `tol` on every side.
///
/// Exact for axis-aligned segments, permissive near the corners of diagonal
/// ones. Only meaningful for points already known to lie on the segment's line.
#[must_use]
pub fn is_point_on_segment(point: &Point2, a: &Point2, b: &Point2, tol: f64) -> bool {
    point.x >= a.x.min(b.x) - tol
        && point.x <= a.x.max(b.x) + tol
        && point.y >= a.y.min(b.y) - tol
        && point.y <= a.y.max(b.y) + tol
}

/// Parameter of `point` projected onto the line `p1 + t * (p2 - p1)`.
///
/// Returns `0.0` for a zero-length segment.
#[must_use]
pub fn param_along(point: &Point2, p1: &Point2, p2: &Point2) -> f64 {
    let d = p2 - p1;
    let len_sq = d.norm_squared();
    if len_sq < 1e-20 {
        return 0.0;
    }
    (point - p1).dot(&d) / len_sq
}
