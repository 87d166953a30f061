use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Extension stripped from document names when building wiki links.
pub const MARKDOWN_EXTENSION: &str = ".md";

/// A document of the corpus, referenced by name.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name, unique within the corpus for matching purposes
    pub name: String,
    /// Corpus-relative path used for navigation
    pub path: String,
}

impl Document {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Unresolved (name, header) pair returned by the retrieval collaborator.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub header: String,
}

impl Candidate {
    pub fn new(name: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            header: header.into(),
        }
    }
}

/// Contiguous block of a document bounded by boundary-pattern matches.
///
/// `start`/`end` are character offsets into the raw text (end exclusive).
/// `text` is the concatenation of the section's line contents without
/// line terminators, so `end - start` is usually larger than its length.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Section {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Location inside a document. `line` is 1-based, `column` is always 0.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PositionSpan {
    pub start: Position,
    pub end: Position,
}

/// Best fuzzy match of a heading against a document's sections.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MatchResult {
    /// Cost-like score, lower is better
    pub score: f64,
    /// Ascending, non-overlapping `(start, end)` character ranges within `matched_text`
    pub highlight_ranges: Vec<(usize, usize)>,
    /// Text of the section the ranges refer to
    pub matched_text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Document found and a section matched the header
    Resolved,
    /// Document found but no section matched the header
    Unmatched,
    /// No document with the candidate's name
    MissingDocument,
    /// Document found but its text could not be read
    Unreadable,
}

/// Display-ready, fully or partially resolved candidate.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Suggestion {
    pub name: String,
    pub header: String,
    pub document: Option<Document>,
    pub position: Option<PositionSpan>,
    #[serde(rename = "match")]
    pub matched: Option<MatchResult>,
    pub status: ResolutionStatus,
}

impl Suggestion {
    /// Start resolution of a candidate; nothing is known yet.
    #[must_use]
    pub fn from_candidate(candidate: Candidate) -> Self {
        Self {
            name: candidate.name,
            header: candidate.header,
            document: None,
            position: None,
            matched: None,
            status: ResolutionStatus::MissingDocument,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.status == ResolutionStatus::Resolved
    }

    /// Wiki link to the suggestion; the heading is only linked once it matched.
    #[must_use]
    pub fn link_text(&self) -> String {
        let stem = self
            .name
            .strip_suffix(MARKDOWN_EXTENSION)
            .unwrap_or(&self.name);
        if self.is_resolved() && !self.header.trim().is_empty() {
            format!("[[{stem}#{}]]", self.header.trim())
        } else {
            format!("[[{stem}]]")
        }
    }
}

/// Bracketed trigger found on the current line.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TriggerSpan {
    pub start_column: usize,
    pub end_column: usize,
    pub query: String,
}

/// Where a suggestion session was started from.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerSource {
    /// Free-text query typed into a search box
    Query,
    /// Text selected in the editor
    Selection,
    /// Bracket trigger typed inline
    Inline(TriggerSpan),
}

/// What the caller should do when the user picks a suggestion.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Commit {
    Open {
        path: Option<String>,
        position: Option<Position>,
    },
    ReplaceSelection {
        text: String,
    },
    ReplaceRange {
        start_column: usize,
        end_column: usize,
        text: String,
    },
}

impl TriggerSource {
    #[must_use]
    pub fn commit(&self, suggestion: &Suggestion) -> Commit {
        match self {
            Self::Query => Commit::Open {
                path: suggestion.document.as_ref().map(|doc| doc.path.clone()),
                position: suggestion.position.map(|span| span.start),
            },
            Self::Selection => Commit::ReplaceSelection {
                text: suggestion.link_text(),
            },
            Self::Inline(span) => Commit::ReplaceRange {
                start_column: span.start_column,
                end_column: span.end_column,
                text: suggestion.link_text(),
            },
        }
    }
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}
