use tracing::trace;

use crate::framing::{StructuralMember, MIN_MEMBER_LENGTH_FT};
use crate::math::distance_2d::point_to_segment_distance;
use crate::math::intersect_2d::{is_point_on_segment, line_intersection, param_along};
use crate::math::polygon_2d::{is_point_inside_polygon, polygon_edges};
use crate::math::{cross_2d, ft_to_px, px_to_ft, Point2, BOUNDARY_TOLERANCE_PX};

/// Members shorter than this many pixels are dropped before clipping.
const DEGENERATE_LENGTH_PX: f64 = 2.0;

/// A rim joist must sit within this distance of a perimeter edge.
const RIM_EDGE_DISTANCE_FT: f64 = 0.5;

/// Maximum direction cross product for a rim joist to follow an edge.
const RIM_PARALLEL_TOL: f64 = 0.2;

/// Result of clipping one segment against the deck footprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipOutcome {
    /// Both endpoints inside; keep the member as is.
    Unchanged,
    /// The in-polygon part of the member.
    Clipped { p1: Point2, p2: Point2, length_ft: f64 },
    /// Nothing of the member lies inside.
    Removed,
}

impl ClipOutcome {
    #[must_use]
    pub fn is_removed(&self) -> bool {
        matches!(self, ClipOutcome::Removed)
    }
}

/// Clips the segment `p1`-`p2` against `polygon`.
///
/// Polygons with fewer than 3 vertices pass every segment through unchanged.
/// Clipping never extends a member: boundary hits outside the parameter range
/// `[-tol/len, 1 + tol/len]` are ignored.
#[must_use]
pub fn clip_segment(p1: &Point2, p2: &Point2, polygon: &[Point2]) -> ClipOutcome {
    if polygon.len() < 3 {
        return ClipOutcome::Unchanged;
    }
    let length_px = nalgebra::distance(p1, p2);
    if length_px < DEGENERATE_LENGTH_PX {
        return ClipOutcome::Removed;
    }

    let p1_inside = is_point_inside_polygon(p1, polygon);
    let p2_inside = is_point_inside_polygon(p2, polygon);
    if p1_inside && p2_inside {
        return ClipOutcome::Unchanged;
    }

    let t_tol = BOUNDARY_TOLERANCE_PX / length_px;
    let mut hits: Vec<(f64, Point2)> = polygon_edges(polygon)
        .filter_map(|(_, a, b)| {
            let hit = line_intersection(p1, p2, a, b)?;
            is_point_on_segment(&hit, a, b, BOUNDARY_TOLERANCE_PX)
                .then(|| (param_along(&hit, p1, p2), hit))
        })
        .filter(|(t, _)| *t >= -t_tol && *t <= 1.0 + t_tol)
        .collect();
    hits.sort_by(|a, b| a.0.total_cmp(&b.0));

    let (new_p1, new_p2) = match (p1_inside, p2_inside) {
        (false, false) => {
            // A single crossing only grazes the boundary.
            if hits.len() < 2 {
                return ClipOutcome::Removed;
            }
            (hits[0].1, hits[hits.len() - 1].1)
        }
        (false, true) => match hits.first() {
            Some(&(_, hit)) => (hit, *p2),
            None => return ClipOutcome::Unchanged,
        },
        (true, false) => match hits.last() {
            Some(&(_, hit)) => (*p1, hit),
            None => return ClipOutcome::Unchanged,
        },
        (true, true) => return ClipOutcome::Unchanged,
    };

    let length_ft = px_to_ft(nalgebra::distance(&new_p1, &new_p2));
    if length_ft < MIN_MEMBER_LENGTH_FT {
        return ClipOutcome::Removed;
    }
    ClipOutcome::Clipped {
        p1: new_p1,
        p2: new_p2,
        length_ft,
    }
}

/// Whether a rim joist runs along some perimeter edge: its midpoint within
/// half a foot of the edge and its direction nearly parallel to it.
///
/// Rejects rim joists that would bridge a concave notch.
#[must_use]
pub fn follows_perimeter(p1: &Point2, p2: &Point2, polygon: &[Point2]) -> bool {
    let d = p2 - p1;
    let len = d.norm();
    if len < 1e-10 {
        return false;
    }
    let dir = d / len;
    let mid = nalgebra::center(p1, p2);
    let max_dist = ft_to_px(RIM_EDGE_DISTANCE_FT);

    polygon_edges(polygon).any(|(_, a, b)| {
        let e = b - a;
        let e_len = e.norm();
        e_len > 1e-10
            && point_to_segment_distance(&mid, a, b) <= max_dist
            && cross_2d(&dir, &(e / e_len)).abs() < RIM_PARALLEL_TOL
    })
}

/// Rim-joist clip: [`follows_perimeter`] first, then [`clip_segment`].
#[must_use]
pub fn clip_rim_segment(p1: &Point2, p2: &Point2, polygon: &[Point2]) -> ClipOutcome {
    if polygon.len() < 3 {
        return ClipOutcome::Unchanged;
    }
    if nalgebra::distance(p1, p2) < DEGENERATE_LENGTH_PX || !follows_perimeter(p1, p2, polygon) {
        return ClipOutcome::Removed;
    }
    clip_segment(p1, p2, polygon)
}

fn apply(member: &StructuralMember, outcome: ClipOutcome) -> Option<StructuralMember> {
    trace!(kind = ?member.kind, ?outcome, "clip");
    match outcome {
        ClipOutcome::Unchanged => Some(member.clone()),
        ClipOutcome::Clipped { p1, p2, .. } => {
            let mut clipped = member.clone();
            clipped.set_endpoints(p1, p2);
            Some(clipped)
        }
        ClipOutcome::Removed => None,
    }
}

/// Clips a member, returning `None` when nothing usable remains.
#[must_use]
pub fn clip_member(member: &StructuralMember, polygon: &[Point2]) -> Option<StructuralMember> {
    apply(member, clip_segment(&member.p1(), &member.p2(), polygon))
}

/// Rim-joist variant of [`clip_member`].
#[must_use]
pub fn clip_rim_joist(member: &StructuralMember, polygon: &[Point2]) -> Option<StructuralMember> {
    apply(member, clip_rim_segment(&member.p1(), &member.p2(), polygon))
}
