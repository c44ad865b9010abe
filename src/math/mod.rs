pub mod distance_2d;
pub mod intersect_2d;
pub mod polygon_2d;

/// 2D point type, in plan pixels.
pub type Point2 = nalgebra::Point2<f64>;

/// 2D vector type, in plan pixels.
pub type Vector2 = nalgebra::Vector2<f64>;

/// Fixed plan scale.
pub const PIXELS_PER_FOOT: f64 = 24.0;

/// Determinant threshold below which two lines are treated as parallel.
pub const EPSILON: f64 = 0.01;

/// Distance from an edge within which a point counts as on the boundary.
pub const BOUNDARY_TOLERANCE_PX: f64 = 2.0;

/// Converts a pixel distance to feet.
#[must_use]
pub fn px_to_ft(px: f64) -> f64 {
    px / PIXELS_PER_FOOT
}

/// Converts feet to a pixel distance.
#[must_use]
pub fn ft_to_px(ft: f64) -> f64 {
    ft * PIXELS_PER_FOOT
}

/// Z component of the 3D cross product of two plan vectors.
#[must_use]
pub fn cross_2d(a: &Vector2, b: &Vector2) -> f64 {
    a.x * b.y - a.y * b.x
}
