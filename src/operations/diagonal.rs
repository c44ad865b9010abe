use tracing::{debug, warn};

use crate::config::DeckInputs;
use crate::framing::{
    AngledBeam, AngledBeamRequest, BeamTrimRequest, BeamType, FramingCalculator, MergedStructure,
    SectionDims, StructuralMember, Usage,
};
use crate::math::distance_2d::point_to_line_distance;
use crate::math::intersect_2d::{is_point_on_segment, line_intersection, param_along};
use crate::math::polygon_2d::{
    bounding_box, diagonal_edges, edge_angle, is_axis_aligned, is_point_inside_polygon,
    perpendicular_vector, signed_side, BoundingBox, DiagonalEdge,
};
use crate::math::{ft_to_px, Point2, BOUNDARY_TOLERANCE_PX};

use super::clip::clip_member;
use super::supports::{
    posts_near_beam, supports_for_beam, supports_for_beam_away_from, SupportLayout, Supports,
};

/// Footings within this distance of a removed post go with it.
const COLOCATED_PX: f64 = 0.5;

/// Reworks a merged structure around the footprint's diagonal edges.
///
/// Joists are extended to the diagonal edges, each diagonal edge gets an
/// angled beam (joined to the nearest outer beam when there is one) and a
/// diagonal rim joist, and orthogonal rim joists past the edge are trimmed.
pub struct DiagonalEdgeHandler<'a, C: FramingCalculator + ?Sized> {
    calculator: &'a C,
    inputs: &'a DeckInputs,
    polygon: &'a [Point2],
    selected_walls: &'a [usize],
}

impl<'a, C: FramingCalculator + ?Sized> DiagonalEdgeHandler<'a, C> {
    #[must_use]
    pub fn new(
        calculator: &'a C,
        inputs: &'a DeckInputs,
        polygon: &'a [Point2],
        selected_walls: &'a [usize],
    ) -> Self {
        Self {
            calculator,
            inputs,
            polygon,
            selected_walls,
        }
    }

    /// Diagonal perimeter edges, excluding house walls.
    #[must_use]
    pub fn edges(&self) -> Vec<DiagonalEdge> {
        diagonal_edges(self.polygon)
            .into_iter()
            .filter(|edge| !self.selected_walls.contains(&edge.index))
            .collect()
    }

    /// Applies diagonal handling, returning the reworked structure.
    #[must_use]
    pub fn execute(&self, structure: MergedStructure) -> MergedStructure {
        let edges = self.edges();
        if edges.is_empty() {
            return structure;
        }
        let Some(bbox) = bounding_box(self.polygon) else {
            return structure;
        };
        let center = bbox.center();
        let ledger_horizontal = self.ledger_horizontal(&structure);
        let extends_positive = self.extends_positive(&structure, ledger_horizontal, &center);
        let layout = SupportLayout::from(self.inputs);

        let mut structure = structure;
        structure.joists = self
            .calculator
            .extend_joists_to_diagonal_edges(
                &structure.joists,
                &edges,
                ledger_horizontal,
                &SectionDims::from(bbox),
                extends_positive,
            )
            .iter()
            .filter_map(|joist| clip_member(joist, self.polygon))
            .collect();

        for edge in &edges {
            let angled = self.angled_beam(edge, &center, &layout);
            let joint = nearest_outer_beam(&structure.beams, edge).and_then(|index| {
                self.joint_inside(&structure.beams[index], &angled.beam)
                    .map(|hit| (index, hit))
            });
            match joint {
                Some((index, hit)) => {
                    self.join_outer_beam(&mut structure, index, hit, angled, &center, &layout);
                }
                None => self.add_standalone_beam(&mut structure, &angled, &bbox, &layout),
            }
            self.add_rim_joist(&mut structure, edge, &center);
        }

        debug!(
            edges = edges.len(),
            beams = structure.beams.len(),
            rim_joists = structure.rim_joists.len(),
            "handled diagonal edges"
        );
        structure
    }

    /// Ledger orientation, falling back to the first house wall and then to
    /// horizontal.
    fn ledger_horizontal(&self, structure: &MergedStructure) -> bool {
        if let Some(ledger) = &structure.ledger {
            return ledger.is_horizontal();
        }
        self.wall_edge()
            .is_none_or(|(a, b)| (b.x - a.x).abs() >= (b.y - a.y).abs())
    }

    /// Whether joists run from the ledger towards increasing coordinates.
    fn extends_positive(&self, structure: &MergedStructure, ledger_horizontal: bool, center: &Point2) -> bool {
        let wall_mid = structure
            .ledger
            .as_ref()
            .map(|ledger| nalgebra::center(&ledger.p1, &ledger.p2))
            .or_else(|| self.wall_edge().map(|(a, b)| nalgebra::center(&a, &b)));
        match wall_mid {
            Some(mid) if ledger_horizontal => mid.y <= center.y,
            Some(mid) => mid.x <= center.x,
            None => true,
        }
    }

    fn wall_edge(&self) -> Option<(Point2, Point2)> {
        let n = self.polygon.len();
        let &wall = self.selected_walls.first()?;
        (n > 0).then(|| (self.polygon[wall % n], self.polygon[(wall + 1) % n]))
    }

    fn angled_beam(&self, edge: &DiagonalEdge, center: &Point2, layout: &SupportLayout) -> AngledBeam {
        let setback_ft = match self.inputs.beam_type {
            BeamType::DropAtRim => 0.0,
            BeamType::Drop | BeamType::Flush => {
                self.calculator.cantilever_for_joist_size(&self.inputs.joist_size)
            }
        };
        self.calculator.calculate_angled_beam_and_posts(&AngledBeamRequest {
            edge_p1: edge.p1,
            edge_p2: edge.p2,
            setback_ft,
            beam_size: self.inputs.beam_size.clone(),
            beam_ply: self.inputs.beam_ply,
            usage: Usage::Diagonal,
            inward_sign: inward_sign(edge, center),
            supports: layout.clone(),
        })
    }

    /// Where the outer beam's line meets the angled beam's line, if that
    /// point is inside the footprint.
    fn joint_inside(&self, outer: &StructuralMember, diagonal: &StructuralMember) -> Option<Point2> {
        let hit = line_intersection(&outer.p1(), &outer.p2(), &diagonal.p1(), &diagonal.p2())?;
        if is_point_inside_polygon(&hit, self.polygon) {
            Some(hit)
        } else {
            debug!(?hit, "outer beam meets diagonal beam outside the footprint");
            None
        }
    }

    fn join_outer_beam(
        &self,
        structure: &mut MergedStructure,
        index: usize,
        joint: Point2,
        angled: AngledBeam,
        center: &Point2,
        layout: &SupportLayout,
    ) {
        let outer = structure.beams[index].clone();
        let trim = self.calculator.trim_beams_at_intersection(&BeamTrimRequest {
            outer_beam: outer.clone(),
            diagonal_beam: angled.beam,
            interior: *center,
            supports: layout.clone(),
        });
        debug!(beam = index, joined = trim.intersection.is_some(), "trimmed outer beam at diagonal");

        remove_supports_near(structure, &outer);
        if let Some((post, footing)) = trim.intersection {
            structure.posts.push(post);
            structure.footings.push(footing);
        }
        match self.clip_joined(&trim.outer_beam, trim.outer_supports, &joint, layout) {
            Some((beam, supports)) => {
                structure.beams[index] = beam;
                push_supports(structure, supports);
            }
            None => {
                structure.beams.remove(index);
            }
        }
        if let Some((beam, supports)) = self.clip_joined(&trim.diagonal_beam, trim.diagonal_supports, &joint, layout) {
            if supports.is_empty() {
                debug!("diagonal beam carried by the joint post alone");
            }
            structure.beams.push(beam);
            push_supports(structure, supports);
        }
    }

    /// Clips a beam trimmed at `joint`. Supports are regenerated only when
    /// clipping changed the beam.
    fn clip_joined(
        &self,
        beam: &StructuralMember,
        supports: Supports,
        joint: &Point2,
        layout: &SupportLayout,
    ) -> Option<(StructuralMember, Supports)> {
        match clip_member(beam, self.polygon) {
            Some(clipped) if clipped == *beam => Some((clipped, supports)),
            Some(clipped) => {
                let supports = supports_for_beam_away_from(&clipped, joint, layout);
                Some((clipped, supports))
            }
            None => {
                debug!(kind = ?beam.kind, usage = ?beam.usage, "joined beam has no part inside the footprint");
                None
            }
        }
    }

    fn add_standalone_beam(
        &self,
        structure: &mut MergedStructure,
        angled: &AngledBeam,
        bbox: &BoundingBox,
        layout: &SupportLayout,
    ) {
        let extended = extend_to_bbox(&angled.beam, bbox);
        let Some(beam) = clip_member(&extended, self.polygon) else {
            debug!("standalone diagonal beam has no part inside the footprint");
            return;
        };
        push_supports(structure, supports_for_beam(&beam, layout));
        structure.beams.push(beam);
    }

    fn add_rim_joist(&self, structure: &mut MergedStructure, edge: &DiagonalEdge, center: &Point2) {
        let inside = signed_side(center, &edge.p1, &edge.p2).signum();
        let tol = BOUNDARY_TOLERANCE_PX;

        for rim in structure
            .rim_joists
            .iter_mut()
            .filter(|rim| !rim.flags.diagonal && is_axis_aligned(&rim.p1(), &rim.p2()))
        {
            let (p1, p2) = (rim.p1(), rim.p2());
            let p1_outside = signed_side(&p1, &edge.p1, &edge.p2) * inside < -tol;
            let p2_outside = signed_side(&p2, &edge.p1, &edge.p2) * inside < -tol;
            match (p1_outside, p2_outside) {
                (false, false) => {}
                (true, true) => {
                    rim.flags.anomalous = true;
                    warn!(edge = edge.index, ?p1, ?p2, "rim joist lies entirely outside diagonal edge");
                }
                (true, false) => {
                    if let Some(hit) = edge_crossing(&p1, &p2, edge) {
                        rim.set_endpoints(hit, p2);
                    }
                }
                (false, true) => {
                    if let Some(hit) = edge_crossing(&p1, &p2, edge) {
                        rim.set_endpoints(p1, hit);
                    }
                }
            }
        }
        structure.rim_joists.retain(|rim| !rim.is_removed());

        let mut diagonal = StructuralMember::rim_joist(edge.p1, edge.p2, self.inputs.joist_size.as_str())
            .with_usage(Usage::Diagonal);
        diagonal.flags.diagonal = true;
        structure.rim_joists.push(diagonal);
    }
}

/// Where the line `p1`-`p2` crosses the diagonal edge itself. Crossings of
/// the edge's extension elsewhere in a concave footprint are ignored.
fn edge_crossing(p1: &Point2, p2: &Point2, edge: &DiagonalEdge) -> Option<Point2> {
    line_intersection(p1, p2, &edge.p1, &edge.p2)
        .filter(|hit| is_point_on_segment(hit, &edge.p1, &edge.p2, BOUNDARY_TOLERANCE_PX))
}

/// `+1.0` when the left-hand perpendicular of the edge points towards
/// `center`, `-1.0` otherwise.
fn inward_sign(edge: &DiagonalEdge, center: &Point2) -> f64 {
    let normal = perpendicular_vector(edge_angle(&edge.p1, &edge.p2));
    let mid = edge.midpoint();
    let step = ft_to_px(1.0);
    let plus = nalgebra::distance(&(mid + normal * step), center);
    let minus = nalgebra::distance(&(mid - normal * step), center);
    if plus <= minus {
        1.0
    } else {
        -1.0
    }
}

/// Index of the axis-aligned outer beam whose line passes nearest the edge
/// midpoint.
fn nearest_outer_beam(beams: &[StructuralMember], edge: &DiagonalEdge) -> Option<usize> {
    let mid = edge.midpoint();
    beams
        .iter()
        .enumerate()
        .filter(|(_, beam)| {
            beam.usage == Usage::Outer && !beam.flags.diagonal && is_axis_aligned(&beam.p1(), &beam.p2())
        })
        .map(|(i, beam)| {
            let (start, end) = beam.centerline();
            (i, point_to_line_distance(&mid, &start, &end))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Extends a beam along its own line to the nearest bounding-box edge
/// crossed beyond each end.
fn extend_to_bbox(beam: &StructuralMember, bbox: &BoundingBox) -> StructuralMember {
    let (p1, p2) = (beam.p1(), beam.p2());
    let hits: Vec<(f64, Point2)> = bbox
        .edges()
        .iter()
        .filter_map(|(a, b)| {
            line_intersection(&p1, &p2, a, b)
                .filter(|hit| is_point_on_segment(hit, a, b, BOUNDARY_TOLERANCE_PX))
        })
        .map(|hit| (param_along(&hit, &p1, &p2), hit))
        .collect();

    let start = hits
        .iter()
        .filter(|(t, _)| *t <= 0.0)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map_or(p1, |&(_, hit)| hit);
    let end = hits
        .iter()
        .filter(|(t, _)| *t >= 1.0)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map_or(p2, |&(_, hit)| hit);

    let mut extended = beam.clone();
    extended.set_endpoints(start, end);
    extended
}

/// Drops the posts associated with `beam` together with their footings.
fn remove_supports_near(structure: &mut MergedStructure, beam: &StructuralMember) {
    let near = posts_near_beam(&structure.posts, beam);
    if near.is_empty() {
        return;
    }
    let removed: Vec<Point2> = near.iter().map(|&i| structure.posts[i].position).collect();

    let mut index = 0;
    structure.posts.retain(|_| {
        let keep = !near.contains(&index);
        index += 1;
        keep
    });
    structure.footings.retain(|footing| {
        !removed
            .iter()
            .any(|p| nalgebra::distance(p, &footing.position) < COLOCATED_PX)
    });
    debug!(removed = removed.len(), "removed supports of replaced beam");
}

fn push_supports(structure: &mut MergedStructure, supports: Supports) {
    structure.posts.extend(supports.posts);
    structure.footings.extend(supports.footings);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::framing::{BasicFramer, Ledger, MemberKind};
    use approx::assert_abs_diff_eq;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point2> {
        coords.iter().map(|&(x, y)| Point2::new(x, y)).collect()
    }

    /// 400 x 300 with the bottom-right corner cut off by a 45 degree edge
    /// from (400, 200) to (300, 300).
    fn chamfered() -> Vec<Point2> {
        pts(&[(0.0, 0.0), (400.0, 0.0), (400.0, 200.0), (300.0, 300.0), (0.0, 300.0)])
    }

    fn inputs() -> DeckInputs {
        DeckInputs::default()
    }

    fn structure() -> MergedStructure {
        let size = "2x8";
        MergedStructure {
            ledger: Some(Ledger::new(Point2::new(0.0, 0.0), Point2::new(400.0, 0.0))),
            beams: vec![StructuralMember::beam(Point2::new(0.0, 264.0), Point2::new(400.0, 264.0), "2x10")
                .with_usage(Usage::Outer)],
            joists: vec![
                StructuralMember::joist(Point2::new(100.0, 0.0), Point2::new(100.0, 300.0), size),
                StructuralMember::joist(Point2::new(350.0, 0.0), Point2::new(350.0, 200.0), size),
            ],
            rim_joists: vec![
                StructuralMember::rim_joist(Point2::new(0.0, 300.0), Point2::new(400.0, 300.0), size),
                StructuralMember::rim_joist(Point2::new(400.0, 0.0), Point2::new(400.0, 300.0), size),
            ],
            ..MergedStructure::default()
        }
    }

    fn handle(structure: MergedStructure, polygon: &[Point2], walls: &[usize]) -> MergedStructure {
        let inputs = inputs();
        DiagonalEdgeHandler::new(&BasicFramer, &inputs, polygon, walls).execute(structure)
    }

    #[test]
    fn house_walls_are_not_diagonal_edges() {
        let polygon = chamfered();
        let inputs = inputs();
        let handler = DiagonalEdgeHandler::new(&BasicFramer, &inputs, &polygon, &[2]);
        assert!(handler.edges().is_empty());
        let handler = DiagonalEdgeHandler::new(&BasicFramer, &inputs, &polygon, &[0]);
        assert_eq!(handler.edges().len(), 1);
    }

    #[test]
    fn orthogonal_footprint_is_untouched() {
        let polygon = pts(&[(0.0, 0.0), (400.0, 0.0), (400.0, 300.0), (0.0, 300.0)]);
        let before = structure();
        assert_eq!(handle(before.clone(), &polygon, &[0]), before);
    }

    #[test]
    fn inward_sign_points_at_center() {
        let edge = DiagonalEdge {
            p1: Point2::new(400.0, 200.0),
            p2: Point2::new(300.0, 300.0),
            index: 2,
        };
        let sign = inward_sign(&edge, &Point2::new(200.0, 150.0));
        let normal = perpendicular_vector(edge_angle(&edge.p1, &edge.p2)) * sign;
        assert!(normal.x < 0.0 && normal.y < 0.0);
    }

    #[test]
    fn joists_reach_the_diagonal_edge() {
        let result = handle(structure(), &chamfered(), &[0]);
        let joist = result
            .joists
            .iter()
            .find(|j| (j.p1().x - 350.0).abs() < 1e-6)
            .unwrap();
        assert_abs_diff_eq!(joist.p2().y.max(joist.p1().y), 250.0, epsilon = 1e-6);
        // The joist under the straight edge is unchanged.
        assert!(result.joists.iter().any(|j| (j.length_ft() - 12.5).abs() < 1e-9));
    }

    #[test]
    fn outer_beam_is_trimmed_and_joined() {
        let result = handle(structure(), &chamfered(), &[0]);
        let outer = result
            .beams
            .iter()
            .find(|b| b.usage == Usage::Outer)
            .unwrap();
        // Diagonal beam sits 1.5 ft (36 px) inside x + y = 600.
        let expected_x = 600.0 - 36.0 * std::f64::consts::SQRT_2 - 264.0;
        assert_abs_diff_eq!(outer.p1().x.max(outer.p2().x), expected_x, epsilon = 1e-6);

        let diagonal = result.beams.iter().find(|b| b.flags.diagonal).unwrap();
        assert_eq!(diagonal.usage, Usage::Diagonal);
        assert_eq!(result.posts.len(), result.footings.len());
        assert!(result
            .posts
            .iter()
            .any(|p| (p.position.x - expected_x).abs() < 1e-6 && (p.position.y - 264.0).abs() < 1e-6));
    }

    #[test]
    fn rim_joists_are_trimmed_at_the_edge() {
        let result = handle(structure(), &chamfered(), &[0]);
        let bottom = result
            .rim_joists
            .iter()
            .find(|r| !r.flags.diagonal && r.is_horizontal())
            .unwrap();
        assert_abs_diff_eq!(bottom.p1().x.max(bottom.p2().x), 300.0, epsilon = 1e-6);
        let right = result
            .rim_joists
            .iter()
            .find(|r| !r.flags.diagonal && r.is_vertical())
            .unwrap();
        assert_abs_diff_eq!(right.p1().y.max(right.p2().y), 200.0, epsilon = 1e-6);

        let diagonal = result.rim_joists.iter().find(|r| r.flags.diagonal).unwrap();
        assert_eq!(diagonal.kind, MemberKind::RimJoist);
        assert_abs_diff_eq!(diagonal.length_px(), 100.0 * std::f64::consts::SQRT_2, epsilon = 1e-9);
    }

    #[test]
    fn rim_entirely_outside_is_flagged() {
        let mut before = structure();
        before.rim_joists.push(StructuralMember::rim_joist(
            Point2::new(380.0, 290.0),
            Point2::new(395.0, 290.0),
            "2x8",
        ));
        let result = handle(before, &chamfered(), &[0]);
        assert_eq!(result.rim_joists.iter().filter(|r| r.flags.anomalous).count(), 1);
    }

    #[test]
    fn without_outer_beam_diagonal_beam_stands_alone() {
        let mut before = structure();
        before.beams.clear();
        let polygon = chamfered();
        let result = handle(before, &polygon, &[0]);
        assert_eq!(result.beams.len(), 1);
        let beam = &result.beams[0];
        assert!(beam.flags.diagonal);
        for p in [beam.p1(), beam.p2()] {
            assert!(is_point_inside_polygon(&p, &polygon));
        }
        assert!(!result.posts.is_empty());
        assert_eq!(result.posts.len(), result.footings.len());
    }

    #[test]
    fn drop_beam_at_rim_sits_on_the_edge() {
        let polygon = chamfered();
        let inputs = DeckInputs {
            beam_type: BeamType::DropAtRim,
            ..DeckInputs::default()
        };
        let result = DiagonalEdgeHandler::new(&BasicFramer, &inputs, &polygon, &[0]).execute(structure());
        let diagonal = result.beams.iter().find(|b| b.flags.diagonal).unwrap();
        for p in [diagonal.p1(), diagonal.p2()] {
            assert_abs_diff_eq!(p.x + p.y, 600.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn flush_beam_keeps_the_cantilever_setback() {
        let polygon = chamfered();
        let inputs = DeckInputs {
            beam_type: BeamType::Flush,
            ..DeckInputs::default()
        };
        let result = DiagonalEdgeHandler::new(&BasicFramer, &inputs, &polygon, &[0]).execute(structure());
        let diagonal = result.beams.iter().find(|b| b.flags.diagonal).unwrap();
        let expected = 600.0 - 36.0 * std::f64::consts::SQRT_2;
        for p in [diagonal.p1(), diagonal.p2()] {
            assert_abs_diff_eq!(p.x + p.y, expected, epsilon = 1e-6);
        }
    }

    /// Chamfer next to the house: the outer beam's line meets the angled
    /// beam beyond the footprint, so the two are not joined.
    #[test]
    fn chamfer_on_ledger_side_keeps_beams_inside() {
        let polygon = pts(&[(0.0, 0.0), (300.0, 0.0), (400.0, 100.0), (400.0, 300.0), (0.0, 300.0)]);
        let result = handle(structure(), &polygon, &[0]);

        let outer = result.beams.iter().find(|b| b.usage == Usage::Outer).unwrap();
        assert_abs_diff_eq!(outer.p1().x, 0.0);
        assert_abs_diff_eq!(outer.p2().x, 400.0);

        let diagonal = result.beams.iter().find(|b| b.flags.diagonal).unwrap();
        // Extended along x - y = 300 - 36 * sqrt(2) to the right side of the box.
        let expected_y = 400.0 - (300.0 - 36.0 * std::f64::consts::SQRT_2);
        assert_abs_diff_eq!(diagonal.p1().y.max(diagonal.p2().y), expected_y, epsilon = 1e-6);

        for beam in &result.beams {
            for p in [beam.p1(), beam.p2()] {
                assert!(is_point_inside_polygon(&p, &polygon), "beam endpoint {p:?}");
            }
        }
        for post in &result.posts {
            assert!(is_point_inside_polygon(&post.position, &polygon), "post {:?}", post.position);
        }
        assert_eq!(result.posts.len(), result.footings.len());
        // The joist under the chamfer keeps its length towards the outer rim.
        let joist = result.joists.iter().find(|j| (j.p1().x - 350.0).abs() < 1e-6).unwrap();
        assert_abs_diff_eq!(joist.length_ft(), 150.0 / 24.0, epsilon = 1e-9);
    }
}
