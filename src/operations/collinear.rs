use tracing::debug;

use super::clip::{clip_member, clip_rim_joist};
use crate::framing::{MemberKind, StructuralMember, Usage};
use crate::math::distance_2d::min_endpoint_distance;
use crate::math::{cross_2d, ft_to_px, Point2, Vector2, PIXELS_PER_FOOT};

/// Kind-specific tolerances for merging members across section seams.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeProfile {
    pub kind: MemberKind,
    /// Maximum difference of the averaged perpendicular coordinates.
    pub perpendicular_tol_ft: f64,
    /// Maximum gap between the closest endpoints.
    pub adjacency_tol_ft: f64,
    /// Cross-product tolerance for non-orthogonal members, in square feet.
    pub cross_tol_ft2: f64,
}

impl MergeProfile {
    pub const BEAM: Self = Self {
        kind: MemberKind::Beam,
        perpendicular_tol_ft: 1.0,
        adjacency_tol_ft: 1.0,
        cross_tol_ft2: 1.0,
    };

    pub const JOIST: Self = Self {
        kind: MemberKind::Joist,
        perpendicular_tol_ft: 0.5,
        adjacency_tol_ft: 2.0,
        cross_tol_ft2: 1.0,
    };

    pub const RIM_JOIST: Self = Self {
        kind: MemberKind::RimJoist,
        perpendicular_tol_ft: 0.5,
        adjacency_tol_ft: 2.0,
        cross_tol_ft2: 1.0,
    };
}

/// Disjoint-set forest over member indices.
#[derive(Debug)]
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, i: usize, j: usize) {
        let (pi, pj) = (self.find(i), self.find(j));
        if pi == pj {
            return;
        }
        match self.rank[pi].cmp(&self.rank[pj]) {
            std::cmp::Ordering::Less => self.parent[pi] = pj,
            std::cmp::Ordering::Greater => self.parent[pj] = pi,
            std::cmp::Ordering::Equal => {
                self.parent[pj] = pi;
                self.rank[pi] += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

fn axis_of(member: &StructuralMember) -> Option<Axis> {
    let d = member.p2() - member.p1();
    match (member.is_horizontal(), member.is_vertical()) {
        (true, true) if d.y.abs() > d.x.abs() => Some(Axis::Vertical),
        (true, _) => Some(Axis::Horizontal),
        (false, true) => Some(Axis::Vertical),
        (false, false) => None,
    }
}

/// Whether two members may be merged at all, ignoring geometry.
#[must_use]
pub fn are_compatible(a: &StructuralMember, b: &StructuralMember, profile: &MergeProfile) -> bool {
    if a.kind != profile.kind || b.kind != profile.kind {
        return false;
    }
    match profile.kind {
        MemberKind::Beam => a.size == b.size && a.usage.is_compatible_with(b.usage),
        _ => true,
    }
}

/// Whether two members lie on the same line within the profile tolerances.
#[must_use]
pub fn are_collinear(a: &StructuralMember, b: &StructuralMember, profile: &MergeProfile) -> bool {
    let perp_tol = ft_to_px(profile.perpendicular_tol_ft);
    match (axis_of(a), axis_of(b)) {
        (Some(Axis::Horizontal), Some(Axis::Horizontal)) => {
            (a.midpoint().y - b.midpoint().y).abs() < perp_tol
        }
        (Some(Axis::Vertical), Some(Axis::Vertical)) => {
            (a.midpoint().x - b.midpoint().x).abs() < perp_tol
        }
        (Some(_), Some(_)) => false,
        _ => {
            let scale = PIXELS_PER_FOOT * PIXELS_PER_FOOT;
            let da = a.p2() - a.p1();
            [b.p1(), b.p2()]
                .iter()
                .all(|p| (cross_2d(&da, &(p - a.p1())) / scale).abs() < profile.cross_tol_ft2)
        }
    }
}

/// Whether the closest endpoints of two members are within the adjacency
/// tolerance.
#[must_use]
pub fn are_adjacent(a: &StructuralMember, b: &StructuralMember, profile: &MergeProfile) -> bool {
    min_endpoint_distance(&a.p1(), &a.p2(), &b.p1(), &b.p2())
        <= ft_to_px(profile.adjacency_tol_ft)
}

/// Groups member indices into connected components of the "compatible,
/// collinear and adjacent" relation.
///
/// Chains of fragments merge even when the end fragments are far apart.
/// Groups are ordered by their lowest member index.
#[must_use]
pub fn group_collinear(members: &[StructuralMember], profile: &MergeProfile) -> Vec<Vec<usize>> {
    let n = members.len();
    let mut sets = DisjointSet::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (&members[i], &members[j]);
            if are_compatible(a, b, profile) && are_collinear(a, b, profile) && are_adjacent(a, b, profile) {
                sets.union(i, j);
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut root_to_group: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        let root = sets.find(i);
        match root_to_group[root] {
            Some(g) => groups[g].push(i),
            None => {
                root_to_group[root] = Some(groups.len());
                groups.push(vec![i]);
            }
        }
    }
    groups
}

/// Direction along which a group's members are laid out.
fn group_direction(group: &[&StructuralMember]) -> Vector2 {
    let axes: Vec<Option<Axis>> = group.iter().map(|m| axis_of(m)).collect();
    if axes.iter().all(|a| *a == Some(Axis::Horizontal)) {
        return Vector2::x();
    }
    if axes.iter().all(|a| *a == Some(Axis::Vertical)) {
        return Vector2::y();
    }
    let longest = group
        .iter()
        .max_by(|a, b| a.length_ft().total_cmp(&b.length_ft()))
        .and_then(|m| m.direction())
        .unwrap_or_else(Vector2::x);
    // Canonical orientation: positive x, or positive y when vertical.
    if longest.x < -1e-10 || (longest.x.abs() <= 1e-10 && longest.y < 0.0) {
        -longest
    } else {
        longest
    }
}

/// Collapses a group into one member spanning all of its endpoints.
///
/// The perpendicular position is the mean of the members' midpoints, which
/// absorbs small misalignment between sections.
fn collapse_group(group: &[&StructuralMember]) -> StructuralMember {
    let template = group[0];
    if group.len() == 1 {
        return template.clone();
    }

    let dir = group_direction(group);
    let normal = Vector2::new(-dir.y, dir.x);

    let mut t_min = f64::INFINITY;
    let mut t_max = f64::NEG_INFINITY;
    for m in group {
        for p in [m.p1(), m.p2()] {
            let t = p.coords.dot(&dir);
            t_min = t_min.min(t);
            t_max = t_max.max(t);
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let offset = group
        .iter()
        .map(|m| m.midpoint().coords.dot(&normal))
        .sum::<f64>()
        / group.len() as f64;

    let mut merged = template.clone();
    merged.set_endpoints(
        Point2::from(dir * t_min + normal * offset),
        Point2::from(dir * t_max + normal * offset),
    );
    merged.flags.merged = true;
    if group.iter().any(|m| m.usage == Usage::Outer) {
        merged.usage = Usage::Outer;
    }
    merged
}

/// Merges collinear fragments of one member kind and re-clips the results
/// against `polygon`.
///
/// Members of other kinds are ignored. Output order is unspecified.
#[must_use]
pub fn merge_collinear(
    members: &[StructuralMember],
    polygon: &[Point2],
    profile: &MergeProfile,
) -> Vec<StructuralMember> {
    let members: Vec<StructuralMember> = members
        .iter()
        .filter(|m| m.kind == profile.kind)
        .cloned()
        .collect();
    let groups = group_collinear(&members, profile);

    let merged: Vec<StructuralMember> = groups
        .iter()
        .map(|group| {
            let refs: Vec<&StructuralMember> = group.iter().map(|&i| &members[i]).collect();
            collapse_group(&refs)
        })
        .filter_map(|m| match profile.kind {
            MemberKind::RimJoist => clip_rim_joist(&m, polygon),
            _ => clip_member(&m, polygon),
        })
        .filter(|m| !m.is_removed())
        .collect();

    debug!(
        kind = ?profile.kind,
        input = members.len(),
        groups = groups.len(),
        output = merged.len(),
        "merged collinear members"
    );
    merged
}

/// Merges beam fragments across section seams and clips them to the
/// footprint.
#[must_use]
pub fn merge_beams(beams: &[StructuralMember], polygon: &[Point2]) -> Vec<StructuralMember> {
    merge_collinear(beams, polygon, &MergeProfile::BEAM)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn rect(w: f64, h: f64) -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(w, 0.0),
            Point2::new(w, h),
            Point2::new(0.0, h),
        ]
    }

    fn beam(x1: f64, y1: f64, x2: f64, y2: f64) -> StructuralMember {
        StructuralMember::beam(Point2::new(x1, y1), Point2::new(x2, y2), "2x10")
            .with_usage(Usage::Outer)
    }

    #[test]
    fn abutting_beams_merge_into_one() {
        let beams = [beam(0.0, 50.0, 96.0, 50.0), beam(96.0, 50.0, 240.0, 50.0)];
        let merged = merge_beams(&beams, &rect(240.0, 100.0));
        assert_eq!(merged.len(), 1);
        assert_abs_diff_eq!(merged[0].length_ft(), 10.0, epsilon = 1e-9);
        assert!(merged[0].flags.merged);
    }

    #[test]
    fn chain_of_three_merges_transitively() {
        // End fragments are 8 ft apart; only the middle one links them.
        let beams = [
            beam(0.0, 50.0, 96.0, 50.0),
            beam(288.0, 50.0, 400.0, 50.0),
            beam(100.0, 51.0, 286.0, 51.0),
        ];
        let merged = merge_beams(&beams, &rect(400.0, 100.0));
        assert_eq!(merged.len(), 1);
        assert_abs_diff_eq!(merged[0].p1().x.min(merged[0].p2().x), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(merged[0].p1().x.max(merged[0].p2().x), 400.0, epsilon = 1e-9);
        // Mean of 50, 50 and 51.
        assert_abs_diff_eq!(merged[0].p1().y, 151.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn different_sizes_do_not_merge() {
        let mut other = beam(96.0, 50.0, 240.0, 50.0);
        other.size = "2x12".to_owned();
        let merged = merge_beams(&[beam(0.0, 50.0, 96.0, 50.0), other], &rect(240.0, 100.0));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn outer_and_wall_side_beams_merge_at_seam() {
        let wall_side = beam(96.0, 50.0, 240.0, 50.0).with_usage(Usage::WallSide);
        let merged = merge_beams(&[beam(0.0, 50.0, 96.0, 50.0), wall_side], &rect(240.0, 100.0));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].usage, Usage::Outer);
    }

    #[test]
    fn gap_beyond_tolerance_keeps_beams_apart() {
        let beams = [beam(0.0, 50.0, 96.0, 50.0), beam(130.0, 50.0, 240.0, 50.0)];
        assert_eq!(merge_beams(&beams, &rect(240.0, 100.0)).len(), 2);
    }

    #[test]
    fn parallel_offset_beams_do_not_merge() {
        let beams = [beam(0.0, 50.0, 96.0, 50.0), beam(96.0, 80.0, 240.0, 80.0)];
        assert_eq!(merge_beams(&beams, &rect(240.0, 100.0)).len(), 2);
    }

    #[test]
    fn merged_beam_is_reclipped() {
        let beams = [beam(-30.0, 50.0, 96.0, 50.0), beam(96.0, 50.0, 200.0, 50.0)];
        let merged = merge_beams(&beams, &rect(240.0, 100.0));
        assert_eq!(merged.len(), 1);
        assert_abs_diff_eq!(merged[0].p1().x, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn merged_beam_outside_polygon_is_dropped() {
        let beams = [beam(300.0, 50.0, 400.0, 50.0), beam(400.0, 50.0, 500.0, 50.0)];
        assert!(merge_beams(&beams, &rect(240.0, 100.0)).is_empty());
    }

    #[test]
    fn rim_joists_use_wider_adjacency() {
        let rims = [
            StructuralMember::rim_joist(Point2::new(0.0, 0.0), Point2::new(96.0, 0.0), "2x8"),
            StructuralMember::rim_joist(Point2::new(130.0, 0.0), Point2::new(240.0, 0.0), "2x8"),
        ];
        let merged = merge_collinear(&rims, &rect(240.0, 100.0), &MergeProfile::RIM_JOIST);
        assert_eq!(merged.len(), 1);
        assert_abs_diff_eq!(merged[0].length_ft(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn diagonal_members_merge_by_cross_product() {
        let joists = [
            StructuralMember::joist(Point2::new(0.0, 0.0), Point2::new(48.0, 48.0), "2x8"),
            StructuralMember::joist(Point2::new(50.0, 50.0), Point2::new(96.0, 96.0), "2x8"),
        ];
        let merged = merge_collinear(&joists, &rect(240.0, 240.0), &MergeProfile::JOIST);
        assert_eq!(merged.len(), 1);
        assert_abs_diff_eq!(merged[0].length_ft(), (2.0_f64).sqrt() * 4.0, epsilon = 1e-9);
    }

    #[test]
    fn other_kinds_are_ignored() {
        let joist = StructuralMember::joist(Point2::new(0.0, 10.0), Point2::new(96.0, 10.0), "2x8");
        assert!(merge_beams(&[joist], &rect(240.0, 100.0)).is_empty());
    }

    #[test]
    fn union_find_groups_components() {
        let mut sets = DisjointSet::new(5);
        sets.union(0, 3);
        sets.union(3, 4);
        assert_eq!(sets.find(0), sets.find(4));
        assert_ne!(sets.find(1), sets.find(0));
    }
}
