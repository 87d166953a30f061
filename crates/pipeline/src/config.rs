use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use vault_suggest_sectioner::{
    BoundaryPattern, SectionSplitter, SectionerConfig, DEFAULT_SECTION_DELIMITER, MAX_INPUT_CHARS,
};

/// User-facing settings, usually loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SuggestConfig {
    /// Boundary pattern used to split notes into sections
    pub section_delimiter: String,

    /// Quiet period after the last keystroke before retrieval starts
    pub debounce_ms: u64,

    /// Retrieval results kept per session
    pub max_suggestions: usize,

    /// Shortest highlighted run accepted by the section matcher
    pub min_match_run: usize,

    /// Vault-relative folders skipped when listing notes
    pub ignored_folders: Vec<String>,

    /// Notes kept in the read cache
    pub cache_capacity: usize,

    /// Character limit for the header and body of each input row
    pub max_input_chars: usize,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            section_delimiter: DEFAULT_SECTION_DELIMITER.to_string(),
            debounce_ms: 500,
            max_suggestions: 10,
            min_match_run: 2,
            ignored_folders: Vec::new(),
            cache_capacity: 64,
            max_input_chars: MAX_INPUT_CHARS,
        }
    }
}

impl SuggestConfig {
    /// Load and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make resolution meaningless, and compile the pattern
    pub fn validate(&self) -> Result<()> {
        if self.max_suggestions == 0 {
            return Err(PipelineError::Config("max_suggestions must be > 0".into()));
        }
        if self.min_match_run == 0 {
            return Err(PipelineError::Config("min_match_run must be > 0".into()));
        }
        if self.cache_capacity == 0 {
            return Err(PipelineError::Config("cache_capacity must be > 0".into()));
        }
        self.boundary_pattern()?;
        Ok(())
    }

    #[must_use]
    pub fn sectioner_config(&self) -> SectionerConfig {
        SectionerConfig {
            section_delimiter: self.section_delimiter.clone(),
            max_input_chars: self.max_input_chars,
        }
    }

    pub fn boundary_pattern(&self) -> Result<BoundaryPattern> {
        Ok(self.sectioner_config().validate()?)
    }

    pub fn splitter(&self) -> Result<SectionSplitter> {
        Ok(SectionSplitter::from_config(&self.sectioner_config())?)
    }

    #[must_use]
    pub const fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            max_suggestions: self.max_suggestions,
        }
    }
}

/// Timing and size limits of the debounced pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub debounce: Duration,
    pub max_suggestions: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        SuggestConfig::default().pipeline_config()
    }
}
