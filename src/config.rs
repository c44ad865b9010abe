use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::framing::{BeamType, FootingType};

/// Precomputed engineering inputs for one deck.
///
/// Sizing (spans, member sizes, post spacing) is decided upstream; the merge
/// engine only places members. Every field has a default so partial TOML
/// documents load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckInputs {
    /// Height of the deck surface above grade, in inches.
    pub deck_height_in: f64,
    pub joist_size: String,
    /// On-center joist spacing, in inches.
    pub joist_spacing_in: f64,
    pub beam_size: String,
    pub beam_ply: u8,
    pub beam_type: BeamType,
    pub post_size: String,
    pub footing_type: FootingType,
    pub max_post_spacing_ft: f64,
    /// Distance from each beam end to its end post.
    pub post_inset_ft: f64,
    /// Joist spans above this get a row of mid-span blocking.
    pub blocking_threshold_ft: f64,
}

impl Default for DeckInputs {
    fn default() -> Self {
        Self {
            deck_height_in: 36.0,
            joist_size: "2x8".to_owned(),
            joist_spacing_in: 16.0,
            beam_size: "2x10".to_owned(),
            beam_ply: 2,
            beam_type: BeamType::Drop,
            post_size: "6x6".to_owned(),
            footing_type: FootingType::Concrete,
            max_post_spacing_ft: 8.0,
            post_inset_ft: 1.0,
            blocking_threshold_ft: 8.0,
        }
    }
}

impl DeckInputs {
    /// Parses deck inputs from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the document is not valid TOML or a
    /// field has the wrong type.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads deck inputs from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, or
    /// `ConfigError::Parse` if its content is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    #[must_use]
    pub fn deck_height_ft(&self) -> f64 {
        self.deck_height_in / 12.0
    }
}
