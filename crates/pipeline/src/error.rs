use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Sectioner error: {0}")]
    Sectioner(#[from] vault_suggest_sectioner::SectionerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Suggestion pipeline is busy, trigger queue is full")]
    Busy,

    #[error("Suggestion pipeline is shut down")]
    Closed,
}

impl PipelineError {
    pub fn retrieval(reason: impl ToString) -> Self {
        Self::Retrieval(reason.to_string())
    }
}
