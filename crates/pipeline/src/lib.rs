//! # Vault Suggest Pipeline
//!
//! Debounced, cancellable suggestion sessions on top of the candidate resolver.
//!
//! ```text
//! keystrokes ──► TriggerEvent ──► quiet window ──► Retriever ──► CandidateResolver
//!                    ▲                 │                               │
//!                    │          newer trigger                          ▼
//!             scan_trigger       supersedes session          SuggestionBatch (broadcast)
//! ```
//!
//! Only the most recent session is ever delivered. Results of a superseded
//! session are dropped when they arrive.

mod config;
mod error;
mod pipeline;
mod retriever;
mod trigger;

pub use config::{PipelineConfig, SuggestConfig};
pub use error::{PipelineError, Result};
pub use pipeline::{
    PipelineState, PipelineStatus, SessionOutcome, SessionToken, SuggestionBatch,
    SuggestionPipeline, TriggerEvent, COMMAND_CAPACITY,
};
pub use retriever::{ReplayRetriever, Retriever};
pub use trigger::scan_trigger;
