use thiserror::Error;

/// Result type for sectioner operations
pub type Result<T> = std::result::Result<T, SectionerError>;

/// Errors that can occur while splitting documents into sections
#[derive(Error, Debug)]
pub enum SectionerError {
    /// Boundary pattern failed to compile
    #[error("Invalid boundary pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Offset past the end of the document
    #[error("Offset {offset} is beyond document length {len}")]
    InvalidOffset { offset: usize, len: usize },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SectionerError {
    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Configuration errors surface before any resolution is attempted
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidPattern { .. } | Self::InvalidConfig(_))
    }
}
