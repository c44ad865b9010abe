use serde::{Deserialize, Serialize};

use super::{Footing, Post, RectangularSection, SectionFraming, StructuralMember, Usage};
use crate::config::DeckInputs;
use crate::error::{Result, SectionError};
use crate::math::distance_2d::{point_to_line_distance, point_to_segment_distance};
use crate::math::polygon_2d::{bounding_box, polygon_edges, BoundingBox, DiagonalEdge};
use crate::math::{px_to_ft, Point2, BOUNDARY_TOLERANCE_PX};
use crate::operations::supports::{SupportLayout, Supports};

/// Extent of one rectangular section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionDims {
    pub min: Point2,
    pub max: Point2,
    pub width_ft: f64,
    pub depth_ft: f64,
}

impl From<BoundingBox> for SectionDims {
    fn from(bbox: BoundingBox) -> Self {
        Self {
            min: bbox.min,
            max: bbox.max,
            width_ft: px_to_ft(bbox.width()),
            depth_ft: px_to_ft(bbox.height()),
        }
    }
}

/// Computes the extent of a rectangle from its corners.
///
/// # Errors
///
/// Returns `SectionError::InvalidCorners` if fewer than 4 corners are given.
pub fn section_dimensions(section_id: usize, corners: &[Point2]) -> Result<SectionDims> {
    match bounding_box(corners) {
        Some(bbox) if corners.len() >= 4 => Ok(bbox.into()),
        _ => Err(SectionError::InvalidCorners {
            section: section_id,
            count: corners.len(),
        }
        .into()),
    }
}

/// Reorders a section's corners clockwise (screen space) from the top-left,
/// and remaps its first ledger wall onto the new edge numbering.
///
/// Edge 0 is then the top edge, 1 the right, 2 the bottom and 3 the left.
#[must_use]
pub fn orient_section(section: &RectangularSection, dims: &SectionDims) -> (Vec<Point2>, Option<usize>) {
    let (min, max) = (dims.min, dims.max);
    let oriented = vec![
        min,
        Point2::new(max.x, min.y),
        max,
        Point2::new(min.x, max.y),
    ];

    let n = section.corners.len();
    let ledger_edge = section.ledger_walls.first().and_then(|&wall| {
        if n == 0 {
            return None;
        }
        let a = section.corners[wall % n];
        let b = section.corners[(wall + 1) % n];
        let mid = nalgebra::center(&a, &b);
        // Closest oriented edge midpoint identifies the wall.
        (0..4).min_by(|&i, &j| {
            let di = nalgebra::distance(&mid, &nalgebra::center(&oriented[i], &oriented[(i + 1) % 4]));
            let dj = nalgebra::distance(&mid, &nalgebra::center(&oriented[j], &oriented[(j + 1) % 4]));
            di.total_cmp(&dj)
        })
    });
    (oriented, ledger_edge)
}

/// Oriented edge of a ledger rectangle that lies along one of the house
/// walls of `polygon`.
///
/// An edge qualifies when both its corners are on the wall's line and its
/// midpoint is on the wall segment. Used for sections flagged as ledger
/// rectangles without an explicit ledger wall.
#[must_use]
pub fn ledger_edge_on_walls(oriented: &[Point2], polygon: &[Point2], walls: &[usize]) -> Option<usize> {
    let n = oriented.len();
    let tol = BOUNDARY_TOLERANCE_PX;
    polygon_edges(polygon)
        .filter(|(index, _, _)| walls.contains(index))
        .find_map(|(_, a, b)| {
            (0..n).find(|&i| {
                let (p, q) = (&oriented[i], &oriented[(i + 1) % n]);
                point_to_line_distance(p, a, b) <= tol
                    && point_to_line_distance(q, a, b) <= tol
                    && point_to_segment_distance(&nalgebra::center(p, q), a, b) <= tol
            })
        })
}

/// Parameters for a beam parallel to a diagonal perimeter edge.
#[derive(Debug, Clone, PartialEq)]
pub struct AngledBeamRequest {
    pub edge_p1: Point2,
    pub edge_p2: Point2,
    /// Inward offset from the edge, in feet.
    pub setback_ft: f64,
    pub beam_size: String,
    pub beam_ply: u8,
    pub usage: Usage,
    /// `+1.0` or `-1.0`: which perpendicular of the edge points into the deck.
    pub inward_sign: f64,
    pub supports: SupportLayout,
}

/// A synthesized angled beam and its supports.
#[derive(Debug, Clone, PartialEq)]
pub struct AngledBeam {
    pub beam: StructuralMember,
    pub posts: Vec<Post>,
    pub footings: Vec<Footing>,
}

/// Two beams to be trimmed where their lines cross.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamTrimRequest {
    pub outer_beam: StructuralMember,
    pub diagonal_beam: StructuralMember,
    /// A point known to be inside the deck, used to pick the kept side.
    pub interior: Point2,
    pub supports: SupportLayout,
}

/// Trimmed beams with regenerated supports.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamTrim {
    pub outer_beam: StructuralMember,
    pub outer_supports: Supports,
    pub diagonal_beam: StructuralMember,
    pub diagonal_supports: Supports,
    /// Shared support where the beams meet; `None` if the lines are parallel.
    pub intersection: Option<(Post, Footing)>,
}

/// The per-rectangle framing calculator the merge engine delegates to.
pub trait FramingCalculator {
    /// Frames one oriented rectangle (corners clockwise from the top-left).
    ///
    /// # Errors
    ///
    /// Returns an error if the section cannot be framed; the merge engine
    /// skips that section.
    fn calculate_structure(
        &self,
        points: &[Point2],
        ledger_edge: Option<usize>,
        inputs: &DeckInputs,
        dims: &SectionDims,
    ) -> Result<SectionFraming>;

    /// Extends joists so they reach the diagonal perimeter edges.
    fn extend_joists_to_diagonal_edges(
        &self,
        joists: &[StructuralMember],
        edges: &[DiagonalEdge],
        ledger_horizontal: bool,
        dims: &SectionDims,
        extends_positive: bool,
    ) -> Vec<StructuralMember>;

    /// Builds a beam parallel to a diagonal edge with its posts.
    fn calculate_angled_beam_and_posts(&self, request: &AngledBeamRequest) -> AngledBeam;

    /// Trims an orthogonal beam and a diagonal beam at their intersection.
    fn trim_beams_at_intersection(&self, request: &BeamTrimRequest) -> BeamTrim;

    /// Allowed joist cantilever past the beam, in feet.
    fn cantilever_for_joist_size(&self, size: &str) -> f64;
}
