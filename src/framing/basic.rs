//! A purely geometric per-rectangle framer.
//!
//! Places a ledger (or a wall-side beam), an outer beam, joists on center,
//! rim joists on the open edges and mid-span blocking for long spans. Member
//! sizes come from [`DeckInputs`]; no span checks are made here.

use super::calculator::{
    AngledBeam, AngledBeamRequest, BeamTrim, BeamTrimRequest, FramingCalculator, SectionDims,
};
use super::{BeamType, Ledger, MemberKind, SectionFraming, StructuralMember, Usage};
use crate::config::DeckInputs;
use crate::error::{GeometryError, Result};
use crate::math::intersect_2d::{is_point_on_segment, line_intersection};
use crate::math::polygon_2d::{edge_angle, perpendicular_vector, signed_side, DiagonalEdge};
use crate::math::{ft_to_px, px_to_ft, Point2, BOUNDARY_TOLERANCE_PX};
use crate::operations::supports::{supports_for_beam, supports_for_beam_away_from, SupportLayout};

/// Section framer used when no external calculator is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicFramer;

/// Section coordinates expressed along the ledger ("along") and from the
/// wall towards the open side ("across").
#[derive(Debug, Clone, Copy)]
struct LocalFrame {
    ledger_horizontal: bool,
    along_min: f64,
    along_max: f64,
    wall: f64,
    outer: f64,
}

impl LocalFrame {
    /// Edge numbering follows `orient_section`: 0 top, 1 right, 2 bottom,
    /// 3 left. Sections without a ledger are framed as if it were on top.
    fn new(dims: &SectionDims, ledger_edge: Option<usize>) -> Self {
        let (min, max) = (dims.min, dims.max);
        match ledger_edge.unwrap_or(0) % 4 {
            0 => Self::horizontal(min.x, max.x, min.y, max.y),
            1 => Self::vertical(min.y, max.y, max.x, min.x),
            2 => Self::horizontal(min.x, max.x, max.y, min.y),
            _ => Self::vertical(min.y, max.y, min.x, max.x),
        }
    }

    fn horizontal(along_min: f64, along_max: f64, wall: f64, outer: f64) -> Self {
        Self {
            ledger_horizontal: true,
            along_min,
            along_max,
            wall,
            outer,
        }
    }

    fn vertical(along_min: f64, along_max: f64, wall: f64, outer: f64) -> Self {
        Self {
            ledger_horizontal: false,
            along_min,
            along_max,
            wall,
            outer,
        }
    }

    fn point(&self, along: f64, across: f64) -> Point2 {
        if self.ledger_horizontal {
            Point2::new(along, across)
        } else {
            Point2::new(across, along)
        }
    }

    /// Member parallel to the ledger at `across`.
    fn parallel(&self, kind: MemberKind, across: f64, size: &str) -> StructuralMember {
        StructuralMember::new(
            kind,
            self.point(self.along_min, across),
            self.point(self.along_max, across),
            size,
        )
    }

    /// Member perpendicular to the ledger at `along`, wall to outer edge.
    fn perpendicular(&self, kind: MemberKind, along: f64, size: &str) -> StructuralMember {
        StructuralMember::new(
            kind,
            self.point(along, self.wall),
            self.point(along, self.outer),
            size,
        )
    }

    fn span(&self) -> f64 {
        (self.outer - self.wall).abs()
    }

    fn outward(&self) -> f64 {
        (self.outer - self.wall).signum()
    }
}

impl BasicFramer {
    fn setback_ft(&self, inputs: &DeckInputs) -> f64 {
        match inputs.beam_type {
            BeamType::Drop => self.cantilever_for_joist_size(&inputs.joist_size),
            BeamType::DropAtRim | BeamType::Flush => 0.0,
        }
    }
}

/// Moves the endpoint of `member` lying outside the line `a`-`b` (relative to
/// `interior`) onto `hit`. When neither endpoint is outside, the endpoint
/// nearer to `hit` moves, so the member reaches the other beam.
fn trim_to_line(
    member: &StructuralMember,
    hit: Point2,
    a: &Point2,
    b: &Point2,
    interior: &Point2,
) -> StructuralMember {
    let inside = signed_side(interior, a, b).signum();
    let s1 = signed_side(&member.p1(), a, b) * inside;
    let s2 = signed_side(&member.p2(), a, b) * inside;
    let tol = BOUNDARY_TOLERANCE_PX;

    let mut trimmed = member.clone();
    match (s1 < -tol, s2 < -tol) {
        (true, false) => trimmed.set_endpoints(hit, member.p2()),
        (false, true) => trimmed.set_endpoints(member.p1(), hit),
        (false, false) => {
            if nalgebra::distance(&member.p1(), &hit) <= nalgebra::distance(&member.p2(), &hit) {
                trimmed.set_endpoints(hit, member.p2());
            } else {
                trimmed.set_endpoints(member.p1(), hit);
            }
        }
        (true, true) => {}
    }
    trimmed
}

impl FramingCalculator for BasicFramer {
    fn calculate_structure(
        &self,
        points: &[Point2],
        ledger_edge: Option<usize>,
        inputs: &DeckInputs,
        dims: &SectionDims,
    ) -> Result<SectionFraming> {
        if points.len() < 4 || dims.width_ft <= 0.0 || dims.depth_ft <= 0.0 {
            return Err(GeometryError::Degenerate(format!(
                "section of {:.2} x {:.2} ft with {} corners",
                dims.width_ft,
                dims.depth_ft,
                points.len()
            ))
            .into());
        }
        let spacing = ft_to_px(inputs.joist_spacing_in / 12.0);
        if spacing <= 0.0 {
            return Err(GeometryError::Degenerate(format!(
                "joist spacing {} in",
                inputs.joist_spacing_in
            ))
            .into());
        }

        let frame = LocalFrame::new(dims, ledger_edge);
        let outward = frame.outward();
        let setback = ft_to_px(self.setback_ft(inputs)).min(frame.span() / 2.0);
        let mut framing = SectionFraming::default();

        let beam_across = frame.outer - outward * setback;
        let beam = |across: f64, usage: Usage| {
            frame
                .parallel(MemberKind::Beam, across, &inputs.beam_size)
                .with_ply(inputs.beam_ply)
                .with_usage(usage)
        };
        framing.beams.push(beam(beam_across, Usage::Outer));

        let joist_wall_end = match ledger_edge {
            Some(_) => {
                framing.ledger = Some(Ledger::new(
                    frame.point(frame.along_min, frame.wall),
                    frame.point(frame.along_max, frame.wall),
                ));
                frame.wall
            }
            None => {
                let wall_beam = frame.wall + outward * setback;
                framing.beams.push(beam(wall_beam, Usage::WallSide));
                framing.rim_joists.push(frame.parallel(
                    MemberKind::RimJoist,
                    frame.wall,
                    &inputs.joist_size,
                ));
                wall_beam
            }
        };

        let mut along = frame.along_min + spacing;
        while along < frame.along_max - 1.0 {
            framing
                .joists
                .push(frame.perpendicular(MemberKind::Joist, along, &inputs.joist_size));
            along += spacing;
        }

        framing.rim_joists.push(frame.parallel(
            MemberKind::RimJoist,
            frame.outer,
            &inputs.joist_size,
        ));
        for side in [frame.along_min, frame.along_max] {
            framing
                .rim_joists
                .push(frame.perpendicular(MemberKind::RimJoist, side, &inputs.joist_size));
        }

        let joist_span_ft = px_to_ft((beam_across - joist_wall_end).abs());
        if joist_span_ft > inputs.blocking_threshold_ft {
            let mid = (beam_across + joist_wall_end) / 2.0;
            framing
                .mid_span_blocking
                .push(frame.parallel(MemberKind::Blocking, mid, &inputs.joist_size));
        }

        let layout = SupportLayout::from(inputs);
        for beam in &framing.beams {
            let supports = supports_for_beam(beam, &layout);
            framing.posts.extend(supports.posts);
            framing.footings.extend(supports.footings);
        }
        Ok(framing)
    }

    fn extend_joists_to_diagonal_edges(
        &self,
        joists: &[StructuralMember],
        edges: &[DiagonalEdge],
        ledger_horizontal: bool,
        dims: &SectionDims,
        extends_positive: bool,
    ) -> Vec<StructuralMember> {
        let across = |p: &Point2| if ledger_horizontal { p.y } else { p.x };
        let direction = if extends_positive { 1.0 } else { -1.0 };
        let tol = BOUNDARY_TOLERANCE_PX;
        let within_dims = |p: &Point2| {
            p.x >= dims.min.x - tol
                && p.x <= dims.max.x + tol
                && p.y >= dims.min.y - tol
                && p.y <= dims.max.y + tol
        };

        joists
            .iter()
            .map(|joist| {
                let (p1, p2) = (joist.p1(), joist.p2());
                let p1_is_near = (across(&p1) <= across(&p2)) == extends_positive;
                let (near, far) = if p1_is_near { (p1, p2) } else { (p2, p1) };

                let hit = edges
                    .iter()
                    .filter_map(|edge| {
                        line_intersection(&near, &far, &edge.p1, &edge.p2)
                            .filter(|hit| is_point_on_segment(hit, &edge.p1, &edge.p2, tol))
                    })
                    .filter(|hit| {
                        within_dims(hit)
                            && (across(hit) - across(&near)) * direction > tol
                            && (across(hit) - across(&far)) * direction > -tol
                    })
                    .min_by(|a, b| {
                        nalgebra::distance(&near, a).total_cmp(&nalgebra::distance(&near, b))
                    });

                let mut extended = joist.clone();
                if let Some(hit) = hit {
                    if p1_is_near {
                        extended.set_endpoints(near, hit);
                    } else {
                        extended.set_endpoints(hit, near);
                    }
                }
                extended
            })
            .collect()
    }

    fn calculate_angled_beam_and_posts(&self, request: &AngledBeamRequest) -> AngledBeam {
        let normal = perpendicular_vector(edge_angle(&request.edge_p1, &request.edge_p2));
        let offset = normal * (request.inward_sign * ft_to_px(request.setback_ft));

        let mut beam = StructuralMember::beam(
            request.edge_p1 + offset,
            request.edge_p2 + offset,
            request.beam_size.as_str(),
        )
        .with_ply(request.beam_ply)
        .with_usage(request.usage);
        beam.flags.diagonal = true;

        let supports = supports_for_beam(&beam, &request.supports);
        AngledBeam {
            beam,
            posts: supports.posts,
            footings: supports.footings,
        }
    }

    fn trim_beams_at_intersection(&self, request: &BeamTrimRequest) -> BeamTrim {
        let (outer, diagonal) = (&request.outer_beam, &request.diagonal_beam);
        let layout = &request.supports;

        let Some(hit) = line_intersection(&outer.p1(), &outer.p2(), &diagonal.p1(), &diagonal.p2())
        else {
            return BeamTrim {
                outer_beam: outer.clone(),
                outer_supports: supports_for_beam(outer, layout),
                diagonal_beam: diagonal.clone(),
                diagonal_supports: supports_for_beam(diagonal, layout),
                intersection: None,
            };
        };

        let outer_beam = trim_to_line(outer, hit, &diagonal.p1(), &diagonal.p2(), &request.interior);
        let diagonal_beam = trim_to_line(diagonal, hit, &outer.p1(), &outer.p2(), &request.interior);
        BeamTrim {
            outer_supports: supports_for_beam_away_from(&outer_beam, &hit, layout),
            diagonal_supports: supports_for_beam_away_from(&diagonal_beam, &hit, layout),
            outer_beam,
            diagonal_beam,
            intersection: Some(layout.support_at(hit)),
        }
    }

    fn cantilever_for_joist_size(&self, size: &str) -> f64 {
        match size {
            "2x6" => 1.0,
            "2x8" => 1.5,
            "2x10" => 2.0,
            "2x12" => 2.5,
            _ => 1.0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::framing::calculator::section_dimensions;
    use approx::assert_abs_diff_eq;

    fn rect(w: f64, h: f64) -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(w, 0.0),
            Point2::new(w, h),
            Point2::new(0.0, h),
        ]
    }

    fn frame(w: f64, h: f64, ledger_edge: Option<usize>, inputs: &DeckInputs) -> SectionFraming {
        let points = rect(w, h);
        let dims = section_dimensions(0, &points).unwrap();
        BasicFramer
            .calculate_structure(&points, ledger_edge, inputs, &dims)
            .unwrap()
    }

    #[test]
    fn ledger_section_has_ledger_and_outer_beam() {
        // 12 ft wide, 10 ft deep, ledger on top.
        let framing = frame(288.0, 240.0, Some(0), &DeckInputs::default());
        let ledger = framing.ledger.unwrap();
        assert_abs_diff_eq!(ledger.length_ft, 12.0);
        assert_eq!(framing.beams.len(), 1);

        // 2x8 joists cantilever 1.5 ft past a drop beam.
        let beam = &framing.beams[0];
        assert_eq!(beam.usage, Usage::Outer);
        assert_abs_diff_eq!(beam.p1().y, 240.0 - 36.0);

        // Outer rim plus two sides; the ledger edge gets none.
        assert_eq!(framing.rim_joists.len(), 3);
        assert_eq!(framing.posts.len(), framing.footings.len());
        assert!(!framing.posts.is_empty());
    }

    #[test]
    fn joists_run_wall_to_outer_edge_on_center() {
        let framing = frame(288.0, 240.0, Some(0), &DeckInputs::default());
        // 16 in on center over 12 ft: 8 interior joists.
        assert_eq!(framing.joists.len(), 8);
        for joist in &framing.joists {
            assert_abs_diff_eq!(joist.length_ft(), 10.0);
            assert!(joist.is_vertical());
        }
    }

    #[test]
    fn freestanding_section_gets_wall_side_beam() {
        let framing = frame(288.0, 240.0, None, &DeckInputs::default());
        assert!(framing.ledger.is_none());
        assert_eq!(framing.beams.len(), 2);
        assert!(framing.beams.iter().any(|b| b.usage == Usage::WallSide));
        assert_eq!(framing.rim_joists.len(), 4);
    }

    #[test]
    fn left_ledger_gives_horizontal_joists() {
        let framing = frame(240.0, 288.0, Some(3), &DeckInputs::default());
        assert!(framing.ledger.unwrap().p1.x.abs() < 1e-9);
        assert!(framing.joists.iter().all(StructuralMember::is_horizontal));
        assert!(framing.beams[0].is_vertical());
    }

    #[test]
    fn flush_beam_sits_on_the_rim_line() {
        let inputs = DeckInputs {
            beam_type: BeamType::Flush,
            ..DeckInputs::default()
        };
        let framing = frame(288.0, 240.0, Some(0), &inputs);
        assert_abs_diff_eq!(framing.beams[0].p1().y, 240.0);
    }

    #[test]
    fn long_span_gets_mid_span_blocking() {
        let framing = frame(288.0, 336.0, Some(0), &DeckInputs::default());
        assert_eq!(framing.mid_span_blocking.len(), 1);
        assert_eq!(framing.mid_span_blocking[0].kind, MemberKind::Blocking);
        let short = frame(288.0, 120.0, Some(0), &DeckInputs::default());
        assert!(short.mid_span_blocking.is_empty());
    }

    #[test]
    fn zero_area_section_fails() {
        let points = rect(0.0, 100.0);
        let dims = section_dimensions(0, &points).unwrap();
        let result = BasicFramer.calculate_structure(&points, Some(0), &DeckInputs::default(), &dims);
        assert!(result.is_err());
    }

    #[test]
    fn joists_extend_to_diagonal_edge() {
        // Bottom-right corner cut from (300, 300) to (400, 200).
        let edge = DiagonalEdge {
            p1: Point2::new(400.0, 200.0),
            p2: Point2::new(300.0, 300.0),
            index: 2,
        };
        let dims = section_dimensions(0, &rect(400.0, 300.0)).unwrap();
        let joists = [
            StructuralMember::joist(Point2::new(350.0, 0.0), Point2::new(350.0, 200.0), "2x8"),
            StructuralMember::joist(Point2::new(100.0, 0.0), Point2::new(100.0, 300.0), "2x8"),
        ];
        let extended = BasicFramer.extend_joists_to_diagonal_edges(&joists, &[edge], true, &dims, true);
        assert_abs_diff_eq!(extended[0].p2().y, 250.0, epsilon = 1e-9);
        assert_abs_diff_eq!(extended[0].p1().y, 0.0);
        // Not under the diagonal edge: untouched.
        assert_eq!(extended[1], joists[1]);
    }

    #[test]
    fn edge_between_ledger_and_joist_end_does_not_shorten() {
        // Top-right corner cut from (300, 0) to (400, 100).
        let edge = DiagonalEdge {
            p1: Point2::new(300.0, 0.0),
            p2: Point2::new(400.0, 100.0),
            index: 1,
        };
        let dims = section_dimensions(0, &rect(400.0, 300.0)).unwrap();
        let joists = [StructuralMember::joist(Point2::new(350.0, 0.0), Point2::new(350.0, 300.0), "2x8")];
        let extended = BasicFramer.extend_joists_to_diagonal_edges(&joists, &[edge], true, &dims, true);
        assert_eq!(extended[0], joists[0]);
    }

    #[test]
    fn angled_beam_is_offset_inward() {
        let request = AngledBeamRequest {
            edge_p1: Point2::new(0.0, 0.0),
            edge_p2: Point2::new(240.0, 0.0),
            setback_ft: 1.5,
            beam_size: "2x10".to_owned(),
            beam_ply: 2,
            usage: Usage::Diagonal,
            inward_sign: 1.0,
            supports: SupportLayout::from(&DeckInputs::default()),
        };
        let angled = BasicFramer.calculate_angled_beam_and_posts(&request);
        assert_abs_diff_eq!(angled.beam.p1().y, 36.0, epsilon = 1e-9);
        assert!(angled.beam.flags.diagonal);
        assert_eq!(angled.posts.len(), 2);
    }

    #[test]
    fn beams_trim_to_shared_intersection() {
        let layout = SupportLayout::from(&DeckInputs::default());
        let outer = StructuralMember::beam(Point2::new(0.0, 264.0), Point2::new(400.0, 264.0), "2x10")
            .with_usage(Usage::Outer);
        let diagonal = StructuralMember::beam(Point2::new(424.0, 200.0), Point2::new(324.0, 300.0), "2x10");
        let trim = BasicFramer.trim_beams_at_intersection(&BeamTrimRequest {
            outer_beam: outer,
            diagonal_beam: diagonal,
            interior: Point2::new(200.0, 150.0),
            supports: layout,
        });
        // Diagonal line x + y = 624 meets y = 264 at x = 360.
        assert_abs_diff_eq!(trim.outer_beam.p1().x, 0.0);
        assert_abs_diff_eq!(trim.outer_beam.p2().x, 360.0, epsilon = 1e-9);
        assert_abs_diff_eq!(trim.outer_beam.length_ft(), 15.0, epsilon = 1e-9);
        assert_abs_diff_eq!(trim.diagonal_beam.p2().y, 264.0, epsilon = 1e-9);
        let (post, footing) = trim.intersection.unwrap();
        assert_eq!(post.position, footing.position);
        assert_abs_diff_eq!(post.position.x, 360.0, epsilon = 1e-9);
    }
}
