use serde::{Deserialize, Serialize};

use super::distance_2d::point_to_segment_distance;
use super::{cross_2d, Point2, Vector2, BOUNDARY_TOLERANCE_PX};

/// Angular deviation from both axes beyond which an edge is diagonal.
const DIAGONAL_ANGLE_TOL_DEG: f64 = 5.0;

/// A perimeter edge that is neither near-horizontal nor near-vertical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagonalEdge {
    pub p1: Point2,
    pub p2: Point2,
    /// Index of the edge in the source polygon (`p1 = pts[index]`).
    pub index: usize,
}

impl DiagonalEdge {
    #[must_use]
    pub fn midpoint(&self) -> Point2 {
        nalgebra::center(&self.p1, &self.p2)
    }
}

/// Axis-aligned bounding box of a point set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point2,
    pub max: Point2,
}

impl BoundingBox {
    #[must_use]
    pub fn center(&self) -> Point2 {
        nalgebra::center(&self.min, &self.max)
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// The four box edges, clockwise in screen space from the top-left corner.
    #[must_use]
    pub fn edges(&self) -> [(Point2, Point2); 4] {
        let tl = self.min;
        let tr = Point2::new(self.max.x, self.min.y);
        let br = self.max;
        let bl = Point2::new(self.min.x, self.max.y);
        [(tl, tr), (tr, br), (br, bl), (bl, tl)]
    }
}

/// Returns the bounding box of `points`, or `None` if there are none.
#[must_use]
pub fn bounding_box(points: &[Point2]) -> Option<BoundingBox> {
    let first = points.first()?;
    let mut min = *first;
    let mut max = *first;
    for p in &points[1..] {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    Some(BoundingBox { min, max })
}

/// Iterates the closed edges of a polygon as `(index, start, end)`.
pub fn polygon_edges<'a>(
    polygon: &'a [Point2],
) -> impl Iterator<Item = (usize, &'a Point2, &'a Point2)> + 'a {
    let n = polygon.len();
    (0..n).map(move |i| (i, &polygon[i], &polygon[(i + 1) % n]))
}

/// Ray-casting point-in-polygon test.
///
/// Returns `false` for polygons with fewer than 3 vertices. Points within
/// [`BOUNDARY_TOLERANCE_PX`] of any edge count as inside.
#[must_use]
pub fn is_point_inside_polygon(point: &Point2, polygon: &[Point2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    if polygon_edges(polygon)
        .any(|(_, a, b)| point_to_segment_distance(point, a, b) <= BOUNDARY_TOLERANCE_PX)
    {
        return true;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (polygon[i].x, polygon[i].y);
        let (xj, yj) = (polygon[j].x, polygon[j].y);

        // Horizontal ray to +x; count edge crossings.
        if ((yi > point.y) != (yj > point.y))
            && (point.x < (xj - xi) * (point.y - yi) / (yj - yi) + xi)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Angle of the edge direction `p1 -> p2` in radians.
#[must_use]
pub fn edge_angle(p1: &Point2, p2: &Point2) -> f64 {
    (p2.y - p1.y).atan2(p2.x - p1.x)
}

/// Unit vector perpendicular (left-hand in math orientation) to `angle`.
#[must_use]
pub fn perpendicular_vector(angle: f64) -> Vector2 {
    Vector2::new(-angle.sin(), angle.cos())
}

/// Signed area test of `point` against the directed line `a -> b`.
///
/// Positive on one side, negative on the other, zero on the line; the
/// magnitude is the perpendicular distance.
#[must_use]
pub fn signed_side(point: &Point2, a: &Point2, b: &Point2) -> f64 {
    let d = b - a;
    let len = d.norm();
    if len < 1e-10 {
        return 0.0;
    }
    cross_2d(&d, &(point - a)) / len
}

/// Whether `p1 -> p2` lies within the diagonal tolerance of either axis.
#[must_use]
pub fn is_axis_aligned(p1: &Point2, p2: &Point2) -> bool {
    let deg = edge_angle(p1, p2).to_degrees().rem_euclid(90.0);
    deg < DIAGONAL_ANGLE_TOL_DEG || deg > 90.0 - DIAGONAL_ANGLE_TOL_DEG
}

/// Returns the polygon edges that are neither near-horizontal nor
/// near-vertical.
#[must_use]
pub fn diagonal_edges(points: &[Point2]) -> Vec<DiagonalEdge> {
    if points.len() < 3 {
        return Vec::new();
    }
    polygon_edges(points)
        .filter(|(_, a, b)| (*b - *a).norm() > 1e-6 && !is_axis_aligned(a, b))
        .map(|(index, a, b)| DiagonalEdge {
            p1: *a,
            p2: *b,
            index,
        })
        .collect()
}
