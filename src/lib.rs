pub mod config;
pub mod error;
pub mod framing;
pub mod math;
pub mod operations;

pub use config::DeckInputs;
pub use error::{FramingError, Result};
pub use framing::{BasicFramer, FramingCalculator, MergedStructure, RectangularSection};
pub use operations::{calculate_multi_section_structure, merge_section_results};
