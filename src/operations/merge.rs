use tracing::{debug, warn};

use crate::config::DeckInputs;
use crate::error::{Result, SectionError};
use crate::framing::{
    ledger_edge_on_walls, orient_section, section_dimensions, FramingCalculator, Ledger, MergedStructure,
    RectangularSection, SectionFraming, StructuralMember,
};
use crate::math::Point2;

use super::clip::{clip_member, clip_rim_joist};
use super::collinear::{merge_beams, merge_collinear, MergeProfile};
use super::diagonal::DiagonalEdgeHandler;
use super::ledger::combine_ledgers;
use super::supports::{recalculate_supports, SupportLayout};

/// Framing computed for one section, keyed by its index in the input list.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionResult {
    pub section_id: usize,
    pub framing: SectionFraming,
}

/// Frames a multi-section footprint: each section independently, then one
/// merge and clip pass over the whole polygon, then diagonal edge handling.
pub struct SectionMerge<'a, C: FramingCalculator + ?Sized> {
    sections: &'a [RectangularSection],
    inputs: &'a DeckInputs,
    selected_walls: &'a [usize],
    polygon: &'a [Point2],
    calculator: &'a C,
}

impl<'a, C: FramingCalculator + ?Sized> SectionMerge<'a, C> {
    #[must_use]
    pub fn new(
        sections: &'a [RectangularSection],
        inputs: &'a DeckInputs,
        selected_walls: &'a [usize],
        polygon: &'a [Point2],
        calculator: &'a C,
    ) -> Self {
        Self {
            sections,
            inputs,
            selected_walls,
            polygon,
            calculator,
        }
    }

    /// Runs the full pipeline.
    ///
    /// # Errors
    ///
    /// Returns `SectionError::NoSections` for an empty section list and
    /// `SectionError::AllSectionsFailed` when no section could be framed.
    /// Individual failing sections are skipped.
    pub fn execute(&self) -> Result<MergedStructure> {
        if self.sections.is_empty() {
            return Err(SectionError::NoSections.into());
        }

        let results: Vec<SectionResult> = self
            .sections
            .iter()
            .enumerate()
            .filter_map(|(section_id, section)| match self.frame_section(section_id, section) {
                Ok(framing) => Some(SectionResult { section_id, framing }),
                Err(err) => {
                    warn!(section = section_id, error = %err, "skipping section");
                    None
                }
            })
            .collect();
        if results.is_empty() {
            return Err(SectionError::AllSectionsFailed {
                count: self.sections.len(),
            }
            .into());
        }

        let merged = merge_section_results(&results, self.sections, self.polygon, self.inputs);
        Ok(DiagonalEdgeHandler::new(self.calculator, self.inputs, self.polygon, self.selected_walls)
            .execute(merged))
    }

    fn frame_section(&self, section_id: usize, section: &RectangularSection) -> Result<SectionFraming> {
        let dims = section_dimensions(section_id, &section.corners)?;
        let (points, ledger_edge) = orient_section(section, &dims);
        let ledger_edge = ledger_edge.or_else(|| {
            if section.is_ledger_rectangle {
                ledger_edge_on_walls(&points, self.polygon, self.selected_walls)
            } else {
                None
            }
        });
        let mut framing = self
            .calculator
            .calculate_structure(&points, ledger_edge, self.inputs, &dims)
            .map_err(|err| SectionError::CalculationFailed {
                section: section_id,
                reason: err.to_string(),
            })?;
        framing.tag_section(section_id);
        debug!(
            section = section_id,
            beams = framing.beams.len(),
            joists = framing.joists.len(),
            rim_joists = framing.rim_joists.len(),
            "framed section"
        );
        Ok(framing)
    }
}

/// Frames every section, merges the results against `original_points` and
/// handles diagonal edges that are not house walls.
///
/// # Errors
///
/// See [`SectionMerge::execute`].
pub fn calculate_multi_section_structure<C: FramingCalculator + ?Sized>(
    sections: &[RectangularSection],
    inputs: &DeckInputs,
    selected_wall_indices: &[usize],
    original_points: &[Point2],
    calculator: &C,
) -> Result<MergedStructure> {
    SectionMerge::new(sections, inputs, selected_wall_indices, original_points, calculator).execute()
}

/// Merges per-section framing into one structure clipped to `polygon`.
///
/// Supports are regenerated from the merged beams; section posts are not
/// carried over.
#[must_use]
pub fn merge_section_results(
    results: &[SectionResult],
    sections: &[RectangularSection],
    polygon: &[Point2],
    inputs: &DeckInputs,
) -> MergedStructure {
    let fragments: Vec<Ledger> = results
        .iter()
        .filter(|r| {
            sections
                .get(r.section_id)
                .is_some_and(RectangularSection::contributes_to_ledger)
        })
        .filter_map(|r| r.framing.ledger.clone())
        .collect();

    let collect = |pick: fn(&SectionFraming) -> &Vec<StructuralMember>| -> Vec<StructuralMember> {
        results.iter().flat_map(|r| pick(&r.framing).iter().cloned()).collect()
    };
    let clip_all = |members: Vec<StructuralMember>| -> Vec<StructuralMember> {
        members.iter().filter_map(|m| clip_member(m, polygon)).collect()
    };

    let beams = merge_beams(&collect(|f| &f.beams), polygon);

    let joists = clip_all(collect(|f| &f.joists));
    let joists = merge_collinear(&joists, polygon, &MergeProfile::JOIST);

    let rim_joists: Vec<StructuralMember> = collect(|f| &f.rim_joists)
        .iter()
        .filter_map(|m| clip_rim_joist(m, polygon))
        .collect();
    let rim_joists = merge_collinear(&rim_joists, polygon, &MergeProfile::RIM_JOIST);

    let supports = recalculate_supports(&beams, &SupportLayout::from(inputs));
    let structure = MergedStructure {
        ledger: combine_ledgers(&fragments),
        beams,
        joists,
        rim_joists,
        posts: supports.posts,
        footings: supports.footings,
        mid_span_blocking: clip_all(collect(|f| &f.mid_span_blocking)),
        picture_frame_blocking: clip_all(collect(|f| &f.picture_frame_blocking)),
    };
    debug!(
        sections = results.len(),
        ledger_fragments = fragments.len(),
        beams = structure.beams.len(),
        joists = structure.joists.len(),
        rim_joists = structure.rim_joists.len(),
        posts = structure.posts.len(),
        "merged section results"
    );
    structure
}
