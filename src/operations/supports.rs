use tracing::debug;

use crate::config::DeckInputs;
use crate::framing::{FootingType, Footing, Post, StructuralMember};
use crate::math::distance_2d::point_to_segment_distance;
use crate::math::{ft_to_px, Point2};

/// Posts within this distance of a beam centerline belong to that beam.
pub const POST_ASSOCIATION_DISTANCE_FT: f64 = 2.0;

/// Post and footing parameters used when placing supports under a beam.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportLayout {
    pub post_size: String,
    pub post_height_ft: f64,
    pub footing_type: FootingType,
    pub post_inset_ft: f64,
    pub max_post_spacing_ft: f64,
}

impl From<&DeckInputs> for SupportLayout {
    fn from(inputs: &DeckInputs) -> Self {
        Self {
            post_size: inputs.post_size.clone(),
            post_height_ft: inputs.deck_height_ft(),
            footing_type: inputs.footing_type,
            post_inset_ft: inputs.post_inset_ft,
            max_post_spacing_ft: inputs.max_post_spacing_ft,
        }
    }
}

impl SupportLayout {
    /// A post with its co-located footing.
    #[must_use]
    pub fn support_at(&self, position: Point2) -> (Post, Footing) {
        (
            Post {
                position,
                size: self.post_size.clone(),
                height_ft: self.post_height_ft,
            },
            Footing {
                position,
                kind: self.footing_type,
            },
        )
    }
}

/// Posts and footings, index-aligned: `footings[i]` sits under `posts[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Supports {
    pub posts: Vec<Post>,
    pub footings: Vec<Footing>,
}

impl Supports {
    pub fn push(&mut self, (post, footing): (Post, Footing)) {
        self.posts.push(post);
        self.footings.push(footing);
    }

    pub fn extend(&mut self, other: Supports) {
        self.posts.extend(other.posts);
        self.footings.extend(other.footings);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Post positions along a beam centerline.
///
/// A beam shorter than two insets gets one post at its midpoint. Otherwise
/// each end gets a post inset by `post_inset_ft`, and spans longer than
/// `max_post_spacing_ft` receive `floor(span / max)` evenly spaced
/// intermediate posts.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn post_positions(beam: &StructuralMember, layout: &SupportLayout) -> Vec<Point2> {
    let (start, end) = beam.centerline();
    let d = end - start;
    let length = d.norm();
    let inset = ft_to_px(layout.post_inset_ft);
    let span = length - 2.0 * inset;

    if length < 2.0 * inset || span < 1e-6 {
        return vec![nalgebra::center(&start, &end)];
    }

    let dir = d / length;
    let first = start + dir * inset;
    let last = end - dir * inset;

    let mut positions = vec![first];
    let max_spacing = ft_to_px(layout.max_post_spacing_ft);
    if max_spacing > 0.0 && span > max_spacing {
        let count = (span / max_spacing).floor() as usize;
        let spacing = span / (count + 1) as f64;
        positions.extend((1..=count).map(|k| first + dir * (spacing * k as f64)));
    }
    positions.push(last);
    positions
}

/// Posts and footings for one beam.
#[must_use]
pub fn supports_for_beam(beam: &StructuralMember, layout: &SupportLayout) -> Supports {
    let mut supports = Supports::default();
    for position in post_positions(beam, layout) {
        supports.push(layout.support_at(position));
    }
    supports
}

/// Supports for a beam that meets another beam at `joint`, minus the end
/// post the shared joint post replaces.
#[must_use]
pub fn supports_for_beam_away_from(
    beam: &StructuralMember,
    joint: &Point2,
    layout: &SupportLayout,
) -> Supports {
    let all = supports_for_beam(beam, layout);
    let keep_beyond = ft_to_px(layout.post_inset_ft) + 1e-6;
    let mut kept = Supports::default();
    for (post, footing) in all.posts.into_iter().zip(all.footings) {
        if nalgebra::distance(&post.position, joint) > keep_beyond {
            kept.push((post, footing));
        }
    }
    kept
}

/// Regenerates every post and footing from final beam geometry.
///
/// Replaces any earlier supports wholesale; nothing is patched.
#[must_use]
pub fn recalculate_supports(beams: &[StructuralMember], layout: &SupportLayout) -> Supports {
    let mut supports = Supports::default();
    for beam in beams {
        supports.extend(supports_for_beam(beam, layout));
    }
    debug!(
        beams = beams.len(),
        posts = supports.len(),
        "recalculated posts and footings"
    );
    supports
}

/// Indices of posts within [`POST_ASSOCIATION_DISTANCE_FT`] of the beam
/// centerline.
#[must_use]
pub fn posts_near_beam(posts: &[Post], beam: &StructuralMember) -> Vec<usize> {
    let (start, end) = beam.centerline();
    let limit = ft_to_px(POST_ASSOCIATION_DISTANCE_FT);
    posts
        .iter()
        .enumerate()
        .filter(|(_, post)| point_to_segment_distance(&post.position, &start, &end) <= limit)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn layout(max_spacing_ft: f64) -> SupportLayout {
        SupportLayout {
            max_post_spacing_ft: max_spacing_ft,
            ..SupportLayout::from(&DeckInputs::default())
        }
    }

    fn beam_ft(len_ft: f64) -> StructuralMember {
        StructuralMember::beam(Point2::new(0.0, 50.0), Point2::new(len_ft * 24.0, 50.0), "2x10")
    }

    #[test]
    fn short_beam_gets_single_midpoint_post() {
        let positions = post_positions(&beam_ft(1.5), &layout(8.0));
        assert_eq!(positions.len(), 1);
        assert_abs_diff_eq!(positions[0].x, 18.0);
    }

    #[test]
    fn end_posts_are_inset() {
        let positions = post_positions(&beam_ft(10.0), &layout(8.0));
        assert_eq!(positions.len(), 2);
        assert_abs_diff_eq!(positions[0].x, 24.0);
        assert_abs_diff_eq!(positions[1].x, 216.0);
    }

    #[test]
    fn long_span_gets_intermediate_posts() {
        // 20 ft beam, 18 ft between end posts, max 8 ft: floor(18/8) = 2 extra.
        let positions = post_positions(&beam_ft(20.0), &layout(8.0));
        assert_eq!(positions.len(), 4);
        let spacing = 18.0 * 24.0 / 3.0;
        assert_abs_diff_eq!(positions[1].x, 24.0 + spacing, epsilon = 1e-9);
        assert_abs_diff_eq!(positions[2].x, 24.0 + 2.0 * spacing, epsilon = 1e-9);
    }

    #[test]
    fn explicit_centerline_drives_placement() {
        let beam = beam_ft(10.0).with_centerline(Point2::new(0.0, 60.0), Point2::new(240.0, 60.0));
        let positions = post_positions(&beam, &layout(8.0));
        assert!(positions.iter().all(|p| (p.y - 60.0).abs() < 1e-9));
    }

    #[test]
    fn every_post_has_a_colocated_footing() {
        let supports = recalculate_supports(&[beam_ft(20.0), beam_ft(4.0)], &layout(8.0));
        assert_eq!(supports.posts.len(), 6);
        assert_eq!(supports.footings.len(), 6);
        for (post, footing) in supports.posts.iter().zip(&supports.footings) {
            assert_eq!(post.position, footing.position);
            assert_eq!(footing.kind, FootingType::Concrete);
            assert_abs_diff_eq!(post.height_ft, 3.0);
        }
    }

    #[test]
    fn joint_end_post_is_left_to_the_shared_post() {
        let joint = Point2::new(240.0, 50.0);
        let supports = supports_for_beam_away_from(&beam_ft(10.0), &joint, &layout(8.0));
        assert_eq!(supports.len(), 1);
        assert_abs_diff_eq!(supports.posts[0].position.x, 24.0);
    }

    #[test]
    fn proximity_association() {
        let beam = beam_ft(10.0);
        let (near, _) = layout(8.0).support_at(Point2::new(100.0, 70.0));
        let (far, _) = layout(8.0).support_at(Point2::new(100.0, 120.0));
        assert_eq!(posts_near_beam(&[far, near], &beam), vec![1]);
    }
}
