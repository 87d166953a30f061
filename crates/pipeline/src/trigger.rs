//! Inline `[[...]]` trigger detection on the line under the cursor.

use once_cell::sync::Lazy;
use regex::Regex;
use vault_suggest_protocol::TriggerSpan;

const OPEN: &str = "[[";
const CLOSE: &str = "]]";

static TRIGGER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[(.*?)\]\]").expect("trigger regex is valid"));

/// Find the bracketed span the cursor sits in.
///
/// Columns count characters. The cursor must be past the opening brackets and no
/// further than the closing ones; a cursor touching the opening brackets is outside.
/// The query is the text between the opening brackets and the cursor, and the
/// replacement range runs through the closing brackets that follow the cursor.
#[must_use]
pub fn scan_trigger(line: &str, cursor_column: usize) -> Option<TriggerSpan> {
    let open_len = OPEN.chars().count();
    let close_len = CLOSE.chars().count();

    for found in TRIGGER_REGEX.find_iter(line) {
        let start_column = char_column(line, found.start());
        let end_column = char_column(line, found.end());
        let content_start = start_column + open_len;
        let content_end = end_column - close_len;

        if cursor_column < content_start || cursor_column > content_end {
            continue;
        }

        let query: String = line
            .chars()
            .skip(content_start)
            .take(cursor_column - content_start)
            .collect();

        return Some(TriggerSpan {
            start_column,
            end_column: cursor_column + close_len,
            query,
        });
    }

    None
}

fn char_column(line: &str, byte_offset: usize) -> usize {
    line[..byte_offset].chars().count()
}
