pub mod clip;
pub mod collinear;
pub mod diagonal;
pub mod ledger;
pub mod merge;
pub mod supports;

pub use clip::{clip_member, clip_rim_joist, clip_segment, ClipOutcome};
pub use collinear::{merge_beams, merge_collinear, MergeProfile};
pub use diagonal::DiagonalEdgeHandler;
pub use ledger::{combine_ledger_pair, combine_ledgers};
pub use merge::{calculate_multi_section_structure, merge_section_results, SectionMerge, SectionResult};
pub use supports::{recalculate_supports, SupportLayout, Supports};
