use crate::corpus::DocumentLookup;
use crate::error::Result;
use crate::fuzzy::{SectionMatcher, DEFAULT_MIN_MATCH_RUN};
use vault_suggest_protocol::{Candidate, MatchResult, PositionSpan, ResolutionStatus, Suggestion};
use vault_suggest_sectioner::{section_span, SectionSplitter};

/// Where a heading was found inside a document
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingLocation {
    pub span: PositionSpan,
    pub result: MatchResult,
}

/// Split `text`, match `header` against the sections and map the winner to lines.
///
/// Deterministic for identical text, pattern and header. An error here means the
/// splitter produced offsets outside the text.
pub fn locate_heading(
    splitter: &SectionSplitter,
    matcher: &mut SectionMatcher,
    text: &str,
    header: &str,
) -> Result<Option<HeadingLocation>> {
    let sections = splitter.split(text);
    let Some(found) = matcher.best_match(&sections, header) else {
        return Ok(None);
    };

    let span = section_span(text, &sections[found.index])?;
    Ok(Some(HeadingLocation {
        span,
        result: found.result,
    }))
}

/// Turns retrieval candidates into navigable suggestions
pub struct CandidateResolver<C> {
    corpus: C,
    splitter: SectionSplitter,
    min_match_run: usize,
}

impl<C: DocumentLookup> CandidateResolver<C> {
    pub fn new(corpus: C, splitter: SectionSplitter) -> Self {
        Self {
            corpus,
            splitter,
            min_match_run: DEFAULT_MIN_MATCH_RUN,
        }
    }

    /// Builder: set the shortest highlight run the matcher accepts
    #[must_use]
    pub fn with_min_match_run(mut self, min_match_run: usize) -> Self {
        self.min_match_run = min_match_run;
        self
    }

    pub fn corpus(&self) -> &C {
        &self.corpus
    }

    pub fn splitter(&self) -> &SectionSplitter {
        &self.splitter
    }

    /// Resolve every candidate in order. A failing candidate degrades, it never aborts the batch.
    pub async fn resolve_all(&self, candidates: Vec<Candidate>) -> Vec<Suggestion> {
        let mut suggestions = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            suggestions.push(self.resolve(candidate).await);
        }
        log::debug!(
            "Resolved {}/{} candidates",
            suggestions.iter().filter(|s| s.is_resolved()).count(),
            suggestions.len()
        );
        suggestions
    }

    /// Resolve one candidate; each step degrades the suggestion instead of failing.
    pub async fn resolve(&self, candidate: Candidate) -> Suggestion {
        let mut suggestion = Suggestion::from_candidate(candidate);

        let document = match self.corpus.find_document(&suggestion.name).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                log::debug!("No document named {:?}", suggestion.name);
                return suggestion;
            }
            Err(err) => {
                log::warn!("Document lookup failed for {:?}: {err}", suggestion.name);
                return suggestion;
            }
        };

        let text = match self.corpus.load_document(&document).await {
            Ok(text) => text,
            Err(err) => {
                log::warn!("Failed to read {:?}: {err}", document.path);
                suggestion.document = Some(document);
                suggestion.status = ResolutionStatus::Unreadable;
                return suggestion;
            }
        };

        suggestion.document = Some(document);
        suggestion.status = ResolutionStatus::Unmatched;

        let mut matcher = SectionMatcher::with_min_run(self.min_match_run);
        match locate_heading(&self.splitter, &mut matcher, &text, &suggestion.header) {
            Ok(Some(location)) => {
                suggestion.position = Some(location.span);
                suggestion.matched = Some(location.result);
                suggestion.status = ResolutionStatus::Resolved;
            }
            Ok(None) => {
                log::debug!(
                    "Header {:?} not found in {:?}",
                    suggestion.header,
                    suggestion.name
                );
            }
            Err(err) => {
                log::error!("Section offsets out of range for {:?}: {err}", suggestion.name);
            }
        }

        suggestion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::MemoryCorpus;
    use crate::error::SearchError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use vault_suggest_protocol::Document;
    use vault_suggest_sectioner::BoundaryPattern;

    const NOTE: &str = "A\n## Intro\ntext\n## Setup\nmore";

    fn resolver<C: DocumentLookup>(corpus: C) -> CandidateResolver<C> {
        let splitter = SectionSplitter::new(BoundaryPattern::new("^## ").unwrap());
        CandidateResolver::new(corpus, splitter)
    }

    struct UnreadableCorpus;

    #[async_trait]
    impl DocumentLookup for UnreadableCorpus {
        async fn list_documents(&self) -> Result<Vec<Document>> {
            Ok(vec![Document::new("locked.md", "vault/locked.md")])
        }

        async fn read_document(&self, name: &str) -> Result<String> {
            Err(SearchError::read_failure(name, "permission denied"))
        }
    }

    #[test]
    fn test_locate_heading_scenario() {
        let splitter = SectionSplitter::new(BoundaryPattern::new("^## ").unwrap());
        let mut matcher = SectionMatcher::new();
        let location = locate_heading(&splitter, &mut matcher, NOTE, "Setup")
            .unwrap()
            .unwrap();

        assert!(location.result.matched_text.contains("Setup"));
        assert_eq!(location.span.start.line, 4);
        assert_eq!(location.span.start.offset, 16);
        assert_eq!(location.span.end.offset, 29);
    }

    #[tokio::test]
    async fn test_resolves_known_heading() {
        let resolver = resolver(MemoryCorpus::new().with_document("note.md", NOTE));
        let suggestion = resolver.resolve(Candidate::new("note.md", "Setup")).await;

        assert_eq!(suggestion.status, ResolutionStatus::Resolved);
        assert_eq!(suggestion.document.as_ref().unwrap().name, "note.md");
        assert_eq!(suggestion.position.unwrap().start.line, 4);
        assert_eq!(suggestion.position.unwrap().start.column, 0);
        assert!(suggestion.matched.unwrap().matched_text.contains("Setup"));
    }

    #[tokio::test]
    async fn test_missing_document_is_not_an_error() {
        let resolver = resolver(MemoryCorpus::new().with_document("note.md", NOTE));
        let suggestion = resolver.resolve(Candidate::new("other.md", "Setup")).await;

        assert_eq!(suggestion.status, ResolutionStatus::MissingDocument);
        assert!(suggestion.document.is_none());
        assert!(suggestion.position.is_none());
        assert!(suggestion.matched.is_none());
    }

    #[tokio::test]
    async fn test_unmatched_header_keeps_document() {
        let resolver = resolver(MemoryCorpus::new().with_document("note.md", NOTE));
        let suggestion = resolver.resolve(Candidate::new("note.md", "Zebra")).await;

        assert_eq!(suggestion.status, ResolutionStatus::Unmatched);
        assert!(suggestion.document.is_some());
        assert!(suggestion.position.is_none());
        assert!(suggestion.matched.is_none());
    }

    #[tokio::test]
    async fn test_unreadable_document_degrades() {
        let resolver = resolver(UnreadableCorpus);
        let suggestion = resolver.resolve(Candidate::new("locked.md", "Setup")).await;

        assert_eq!(suggestion.status, ResolutionStatus::Unreadable);
        assert_eq!(suggestion.document.unwrap().path, "vault/locked.md");
        assert!(suggestion.position.is_none());
    }

    #[tokio::test]
    async fn test_resolve_all_keeps_order_and_survives_failures() {
        let resolver = resolver(MemoryCorpus::new().with_document("note.md", NOTE));
        let suggestions = resolver
            .resolve_all(vec![
                Candidate::new("gone.md", "Setup"),
                Candidate::new("note.md", "Intro"),
                Candidate::new("note.md", "Setup"),
            ])
            .await;

        let statuses: Vec<_> = suggestions.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                ResolutionStatus::MissingDocument,
                ResolutionStatus::Resolved,
                ResolutionStatus::Resolved,
            ]
        );
        assert_eq!(suggestions[1].position.unwrap().start.line, 2);
        assert_eq!(suggestions[2].position.unwrap().start.line, 4);
    }
}
