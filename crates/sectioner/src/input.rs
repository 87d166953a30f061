//! Embedding input rows: one cleaned (header, body) pair per section of a note.
//!
//! The headers produced here are what the retrieval side later hands back as
//! candidate headers, so the matcher sees them in this cleaned form.

use crate::config::{BoundaryPattern, MAX_INPUT_CHARS};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static EMBED_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[.*?\]\(.*?\)").expect("embed regex is valid"));

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputRow {
    pub name: String,
    pub mtime: String,
    pub section: String,
    pub body: String,
}

/// Extract input rows from a note using the default length limit
#[must_use]
pub fn extract_input_rows(
    name: &str,
    mtime: &str,
    text: &str,
    pattern: &BoundaryPattern,
) -> Vec<InputRow> {
    InputExtractor::new(name, mtime, MAX_INPUT_CHARS).run(text, pattern)
}

/// Extract input rows with an explicit character limit per field
#[must_use]
pub fn extract_input_rows_with_limit(
    name: &str,
    mtime: &str,
    text: &str,
    pattern: &BoundaryPattern,
    max_chars: usize,
) -> Vec<InputRow> {
    InputExtractor::new(name, mtime, max_chars).run(text, pattern)
}

struct InputExtractor<'a> {
    name: &'a str,
    mtime: &'a str,
    max_chars: usize,
    rows: Vec<InputRow>,
}

impl<'a> InputExtractor<'a> {
    const fn new(name: &'a str, mtime: &'a str, max_chars: usize) -> Self {
        Self {
            name,
            mtime,
            max_chars,
            rows: Vec::new(),
        }
    }

    fn run(mut self, text: &str, pattern: &BoundaryPattern) -> Vec<InputRow> {
        let mut header = String::new();
        let mut body = String::new();

        for line in text.lines() {
            if pattern.is_boundary(line) {
                self.flush(&header, &body);
                header = line.to_string();
                body = line.to_string();
            } else {
                if header.is_empty() {
                    header = line.to_string();
                }
                let cleaned = clean_text(line, self.max_chars);
                if !cleaned.is_empty() {
                    body.push(' ');
                    body.push_str(&cleaned);
                }
            }
        }
        self.flush(&header, &body);

        log::debug!("Extracted {} input rows from {}", self.rows.len(), self.name);
        self.rows
    }

    fn flush(&mut self, header: &str, body: &str) {
        let section = clean_text(header, self.max_chars);
        let body = clean_text(body, self.max_chars);
        if section.is_empty() && body.is_empty() {
            return;
        }
        self.rows.push(InputRow {
            name: self.name.to_string(),
            mtime: self.mtime.to_string(),
            section,
            body,
        });
    }
}

/// Strip hashtags and embedded images, trim, and cap the length
#[must_use]
pub fn clean_text(text: &str, max_chars: usize) -> String {
    let without_hashes = text.replace('#', "");
    let without_embeds = EMBED_REGEX.replace_all(&without_hashes, "");
    without_embeds.trim().chars().take(max_chars).collect()
}
