use crate::error::{Result, SectionerError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default boundary: any Markdown ATX heading.
pub const DEFAULT_SECTION_DELIMITER: &str = "^#{1,6} ";

/// Longest cleaned header or body kept for an input row, in characters.
pub const MAX_INPUT_CHARS: usize = 8191;

/// Configuration for section splitting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SectionerConfig {
    /// Regex a line must match to start a new section
    pub section_delimiter: String,

    /// Character limit for cleaned input-row text
    pub max_input_chars: usize,
}

impl Default for SectionerConfig {
    fn default() -> Self {
        Self {
            section_delimiter: DEFAULT_SECTION_DELIMITER.to_string(),
            max_input_chars: MAX_INPUT_CHARS,
        }
    }
}

impl SectionerConfig {
    /// Create config splitting on a custom delimiter
    pub fn with_delimiter(delimiter: impl Into<String>) -> Self {
        Self {
            section_delimiter: delimiter.into(),
            ..Default::default()
        }
    }

    /// Validate configuration and compile the boundary pattern
    pub fn validate(&self) -> Result<BoundaryPattern> {
        if self.max_input_chars == 0 {
            return Err(SectionerError::invalid_config(
                "max_input_chars must be > 0",
            ));
        }
        BoundaryPattern::new(&self.section_delimiter)
    }
}

/// Compiled boundary rule. Construction is the only place a bad pattern can fail.
#[derive(Clone)]
pub struct BoundaryPattern {
    regex: Regex,
}

impl BoundaryPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex =
            Regex::new(pattern).map_err(|e| SectionerError::invalid_pattern(pattern, e))?;
        Ok(Self { regex })
    }

    /// Check whether a line (without terminator) starts a new section
    #[must_use]
    pub fn is_boundary(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl Default for BoundaryPattern {
    fn default() -> Self {
        Self {
            regex: Regex::new(DEFAULT_SECTION_DELIMITER).expect("default delimiter is valid"),
        }
    }
}

impl fmt::Debug for BoundaryPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoundaryPattern").field(&self.as_str()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = SectionerConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let config = SectionerConfig::with_delimiter("^(## ");
        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("^(## "));
    }

    #[test]
    fn test_zero_input_chars_rejected() {
        let config = SectionerConfig {
            max_input_chars: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_boundary_matches_headings() {
        let pattern = BoundaryPattern::default();
        assert!(pattern.is_boundary("# Title"));
        assert!(pattern.is_boundary("###### Deep"));
        assert!(!pattern.is_boundary("####### Too deep"));
        assert!(!pattern.is_boundary("text with # inside"));
        assert!(!pattern.is_boundary("#hashtag"));
    }

    #[test]
    fn test_empty_pattern_matches_every_line() {
        let pattern = BoundaryPattern::new("").unwrap();
        assert!(pattern.is_boundary(""));
        assert!(pattern.is_boundary("anything"));
    }
}
