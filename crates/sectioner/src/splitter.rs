use crate::config::{BoundaryPattern, SectionerConfig};
use crate::error::Result;
use vault_suggest_protocol::Section;

/// Splits raw document text into contiguous sections
#[derive(Debug, Clone, Default)]
pub struct SectionSplitter {
    pattern: BoundaryPattern,
}

impl SectionSplitter {
    #[must_use]
    pub const fn new(pattern: BoundaryPattern) -> Self {
        Self { pattern }
    }

    /// Build a splitter from configuration, rejecting bad patterns up front
    pub fn from_config(config: &SectionerConfig) -> Result<Self> {
        Ok(Self::new(config.validate()?))
    }

    #[must_use]
    pub const fn pattern(&self) -> &BoundaryPattern {
        &self.pattern
    }

    /// Split `text` into sections in document order.
    ///
    /// A line matching the boundary pattern closes the running section unless it is
    /// the first line. Offsets count characters including line terminators, so the
    /// sections tile `[0, len)` exactly; section text drops the terminators.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<Section> {
        let mut sections = Vec::new();
        let mut cursor = 0usize;
        let mut start = 0usize;
        let mut accumulated = String::new();

        for raw_line in text.split_inclusive('\n') {
            let line = strip_line_terminator(raw_line);
            if cursor != 0 && self.pattern.is_boundary(line) {
                sections.push(Section {
                    text: std::mem::take(&mut accumulated),
                    start,
                    end: cursor,
                });
                start = cursor;
            }
            accumulated.push_str(line);
            cursor += raw_line.chars().count();
        }

        // The trailing section has no boundary after it; flush it explicitly.
        if cursor > start {
            sections.push(Section {
                text: accumulated,
                start,
                end: cursor,
            });
        }

        log::debug!(
            "Split {} chars into {} sections with pattern {:?}",
            cursor,
            sections.len(),
            self.pattern.as_str()
        );
        sections
    }
}

fn strip_line_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
