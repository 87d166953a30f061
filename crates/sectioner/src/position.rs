use crate::error::{Result, SectionerError};
use vault_suggest_protocol::{Position, PositionSpan, Section};

/// Map a character offset to a 1-based line. The column is never recovered.
pub fn offset_to_position(text: &str, offset: usize) -> Result<Position> {
    let mut line = 1;
    let mut seen = 0;
    for ch in text.chars() {
        if seen == offset {
            break;
        }
        if ch == '\n' {
            line += 1;
        }
        seen += 1;
    }

    if seen < offset {
        return Err(SectionerError::InvalidOffset { offset, len: seen });
    }

    Ok(Position {
        line,
        column: 0,
        offset,
    })
}

/// Start and end positions of a section of `text`
pub fn section_span(text: &str, section: &Section) -> Result<PositionSpan> {
    Ok(PositionSpan {
        start: offset_to_position(text, section.start)?,
        end: offset_to_position(text, section.end)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_offset_zero_is_first_line() {
        assert_eq!(
            offset_to_position("anything", 0).unwrap(),
            Position {
                line: 1,
                column: 0,
                offset: 0
            }
        );
    }

    #[test]
    fn test_counts_preceding_newlines() {
        let text = "a\nb\nc";
        assert_eq!(offset_to_position(text, 4).unwrap().line, 3);
        assert_eq!(offset_to_position(text, 2).unwrap().line, 2);
        assert_eq!(offset_to_position(text, 1).unwrap().line, 1);
    }

    #[test]
    fn test_end_of_text_is_valid() {
        let position = offset_to_position("a\nb", 3).unwrap();
        assert_eq!(position.line, 2);
        assert_eq!(position.offset, 3);
    }

    #[test]
    fn test_offsets_are_characters_not_bytes() {
        let text = "é\nü\nx";
        assert_eq!(offset_to_position(text, 4).unwrap().line, 3);
        assert!(offset_to_position(text, 6).is_err());
    }

    #[test]
    fn test_offset_past_end_is_rejected() {
        match offset_to_position("abc", 4) {
            Err(SectionerError::InvalidOffset { offset, len }) => {
                assert_eq!((offset, len), (4, 3));
            }
            other => panic!("expected InvalidOffset, got {other:?}"),
        }
    }

    #[test]
    fn test_section_span() {
        let text = "A\n## Intro\ntext\n## Setup\nmore";
        let section = Section {
            text: "## Setupmore".to_string(),
            start: 16,
            end: 29,
        };
        let span = section_span(text, &section).unwrap();
        assert_eq!(span.start.line, 4);
        assert_eq!(span.end.line, 5);
    }
}
