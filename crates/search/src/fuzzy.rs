use nucleo_matcher::pattern::{AtomKind, CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};
use vault_suggest_protocol::{MatchResult, Section};

/// Shortest highlighted run kept; single characters are noise.
pub const DEFAULT_MIN_MATCH_RUN: usize = 2;

/// Best section for a heading query
#[derive(Debug, Clone, PartialEq)]
pub struct SectionMatch {
    /// Index into the scanned sections
    pub index: usize,
    pub result: MatchResult,
}

/// Fuzzy heading matcher over document sections using nucleo-matcher.
///
/// Scores ignore where in a section the match lands. nucleo scores grow with
/// quality, so they are mapped to a cost where lower is better.
pub struct SectionMatcher {
    matcher: Matcher,
    min_run: usize,
}

impl SectionMatcher {
    pub fn new() -> Self {
        Self::with_min_run(DEFAULT_MIN_MATCH_RUN)
    }

    pub fn with_min_run(min_run: usize) -> Self {
        Self {
            matcher: Matcher::new(Config::DEFAULT),
            min_run: min_run.max(1),
        }
    }

    /// Pick the lowest-cost section; the first one wins on equal cost.
    /// Returns `None` when nothing matches with at least one run of `min_run` chars.
    pub fn best_match(&mut self, sections: &[Section], query: &str) -> Option<SectionMatch> {
        if query.trim().is_empty() || sections.is_empty() {
            return None;
        }

        let pattern = Pattern::new(
            query,
            CaseMatching::Ignore,
            Normalization::Smart,
            AtomKind::Fuzzy,
        );

        let mut best: Option<SectionMatch> = None;
        let mut buf = Vec::new();
        let mut indices = Vec::new();

        for (index, section) in sections.iter().enumerate() {
            indices.clear();
            let haystack = char_haystack(&section.text, &mut buf);
            // Every query word appends its own indices; keep them all.
            let Some(raw_score) = pattern.indices(haystack, &mut self.matcher, &mut indices)
            else {
                continue;
            };

            let highlight_ranges = collect_runs(&mut indices, self.min_run);
            if highlight_ranges.is_empty() {
                continue;
            }

            let score = score_to_cost(raw_score);
            if best.as_ref().is_some_and(|current| score >= current.result.score) {
                continue;
            }

            best = Some(SectionMatch {
                index,
                result: MatchResult {
                    score,
                    highlight_ranges,
                    matched_text: section.text.clone(),
                },
            });
        }

        if best.is_none() {
            log::debug!(
                "No section matched {query:?} among {} sections",
                sections.len()
            );
        }
        best
    }
}

impl Default for SectionMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// One slot per `char`, so match indices are char offsets into the text.
/// `Utf32Str::new` would fold grapheme clusters into a single slot instead.
fn char_haystack<'a>(text: &'a str, buf: &'a mut Vec<char>) -> Utf32Str<'a> {
    if text.is_ascii() {
        return Utf32Str::Ascii(text.as_bytes());
    }
    buf.clear();
    buf.extend(text.chars());
    Utf32Str::Unicode(buf)
}

fn score_to_cost(raw: u32) -> f64 {
    1.0 / (1.0 + f64::from(raw))
}

/// Merge matched char indices into ascending `(start, end)` runs of at least `min_run`.
fn collect_runs(indices: &mut Vec<u32>, min_run: usize) -> Vec<(usize, usize)> {
    indices.sort_unstable();
    indices.dedup();

    let mut runs = Vec::new();
    let mut iter = indices.iter().map(|&i| i as usize);
    let Some(first) = iter.next() else {
        return runs;
    };

    let (mut start, mut end) = (first, first + 1);
    for idx in iter {
        if idx == end {
            end += 1;
            continue;
        }
        if end - start >= min_run {
            runs.push((start, end));
        }
        start = idx;
        end = idx + 1;
    }
    if end - start >= min_run {
        runs.push((start, end));
    }
    runs
}
