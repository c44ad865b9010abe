use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the deck framing engine.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Section(#[from] SectionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors related to geometric input.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}

/// Errors raised while framing or merging rectangular sections.
#[derive(Debug, Error)]
pub enum SectionError {
    #[error("section {section} has {count} corners, expected 4")]
    InvalidCorners { section: usize, count: usize },

    #[error("section {section} could not be framed: {reason}")]
    CalculationFailed { section: usize, reason: String },

    #[error("no sections to frame")]
    NoSections,

    #[error("all {count} sections failed to frame")]
    AllSectionsFailed { count: usize },
}

/// Errors raised while loading deck inputs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse deck inputs: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Convenience type alias for results using [`FramingError`].
pub type Result<T> = std::result::Result<T, FramingError>;
