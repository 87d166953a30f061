use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("No document named {0:?}")]
    LookupMiss(String),

    #[error("Failed to read {name:?}: {reason}")]
    ReadFailure { name: String, reason: String },

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Sectioner error: {0}")]
    Sectioner(#[from] vault_suggest_sectioner::SectionerError),
}

impl SearchError {
    pub fn read_failure(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::ReadFailure {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}
