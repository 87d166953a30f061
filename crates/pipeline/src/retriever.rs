use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use vault_suggest_protocol::Candidate;

/// Source of ranked candidates for a query, usually a remote retrieval service.
///
/// The pipeline owns session bookkeeping; implementations only answer a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, auth_token: &str) -> Result<Vec<Candidate>>;
}

#[async_trait]
impl<T: Retriever + ?Sized> Retriever for Arc<T> {
    async fn retrieve(&self, query: &str, auth_token: &str) -> Result<Vec<Candidate>> {
        (**self).retrieve(query, auth_token).await
    }
}

/// Answers every query with the same recorded candidate list
#[derive(Debug, Clone, Default)]
pub struct ReplayRetriever {
    candidates: Vec<Candidate>,
}

impl ReplayRetriever {
    #[must_use]
    pub const fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Parse a JSON array of `{"name": ..., "header": ...}` objects
    pub fn from_json(raw: &str) -> Result<Self> {
        let candidates: Vec<Candidate> =
            serde_json::from_str(raw).map_err(PipelineError::retrieval)?;
        Ok(Self::new(candidates))
    }

    #[must_use]
    pub fn into_candidates(self) -> Vec<Candidate> {
        self.candidates
    }
}

#[async_trait]
impl Retriever for ReplayRetriever {
    async fn retrieve(&self, query: &str, _auth_token: &str) -> Result<Vec<Candidate>> {
        log::debug!(
            "Replaying {} candidates for {query:?}",
            self.candidates.len()
        );
        Ok(self.candidates.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_replay_from_json() {
        let retriever = ReplayRetriever::from_json(
            r#"[{"name": "Broadcast.md", "header": "Reliable Broadcast"}]"#,
        )
        .unwrap();

        let candidates = retriever.retrieve("anything", "").await.unwrap();
        assert_eq!(
            candidates,
            vec![Candidate::new("Broadcast.md", "Reliable Broadcast")]
        );
    }

    #[test]
    fn test_replay_keeps_recorded_order() {
        let retriever = ReplayRetriever::from_json(
            r#"[{"name": "b.md", "header": "Two"}, {"name": "a.md", "header": "One"}]"#,
        )
        .unwrap();
        assert_eq!(
            retriever.into_candidates(),
            vec![Candidate::new("b.md", "Two"), Candidate::new("a.md", "One")]
        );
    }

    #[test]
    fn test_replay_rejects_malformed_json() {
        let err = ReplayRetriever::from_json("{not json").unwrap_err();
        assert!(matches!(err, PipelineError::Retrieval(_)));
    }
}
