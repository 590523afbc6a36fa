//! Line filter and match highlighting for the raw log viewer.
//!
//! Lines are split on `\n` only and returned byte-for-byte: a trailing `\r`
//! stays part of its line and nothing is trimmed. A final newline does not
//! produce an extra empty line. Matching is case-insensitive using Unicode
//! lowercase folding; highlight ranges are byte ranges into the original line.

use std::ops::Range;

/// Split log text into lines without any normalization.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_terminator('\n').collect()
}

/// Lines containing `query` (case-insensitive), in original order.
/// An empty query returns every line.
pub fn filter_lines<'a>(text: &'a str, query: &str) -> Vec<&'a str> {
    let needle = Folded::new(query);
    split_lines(text)
        .into_iter()
        .filter(|line| needle.text.is_empty() || !find_matches(line, &needle).is_empty())
        .collect()
}

/// Byte ranges of every non-overlapping case-insensitive occurrence of `query`.
pub fn highlight(line: &str, query: &str) -> Vec<Range<usize>> {
    let needle = Folded::new(query);
    if needle.text.is_empty() {
        return Vec::new();
    }
    find_matches(line, &needle)
}

/// Lowercase-folded text with a map from each folded byte back to the
/// original character it came from.
struct Folded {
    text: String,
    origin: Vec<Range<usize>>,
}

impl Folded {
    fn new(source: &str) -> Self {
        let mut text = String::with_capacity(source.len());
        let mut origin = Vec::with_capacity(source.len());
        for (start, c) in source.char_indices() {
            let span = start..start + c.len_utf8();
            for lower in c.to_lowercase() {
                text.push(lower);
                for _ in 0..lower.len_utf8() {
                    origin.push(span.clone());
                }
            }
        }
        Self { text, origin }
    }
}

/// Matches are widened to whole original characters. A character that folds
/// to several code points (`İ` -> `i\u{307}`) can put two folded matches
/// inside the same original character; a range starting before the previous
/// one ends is dropped so the result stays sorted and non-overlapping.
fn find_matches(line: &str, needle: &Folded) -> Vec<Range<usize>> {
    let hay = Folded::new(line);
    let mut ranges: Vec<Range<usize>> = Vec::new();
    for (start, matched) in hay.text.match_indices(needle.text.as_str()) {
        let end = start + matched.len();
        let range = hay.origin[start].start..hay.origin[end - 1].end;
        if ranges.last().is_some_and(|prev| range.start < prev.end) {
            continue;
        }
        ranges.push(range);
    }
    ranges
}

/// A line that survived filtering, with its position and highlight spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedLine<'a> {
    pub number: usize,
    pub text: &'a str,
    pub ranges: Vec<Range<usize>>,
}

/// Owned log text with its line split computed once.
///
/// The viewer re-filters on every keystroke; keeping the split avoids
/// rescanning the whole text for line boundaries each time.
#[derive(Debug, Clone, Default)]
pub struct LogIndex {
    text: String,
    lines: Vec<Range<usize>>,
}

impl LogIndex {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut lines = Vec::new();
        let mut start = 0;
        for line in split_lines(&text) {
            lines.push(start..start + line.len());
            start += line.len() + 1;
        }
        Self { text, lines }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(|range| &self.text[range.clone()])
    }

    /// Filter with highlight spans. `number` is the 1-based original line number.
    pub fn search(&self, query: &str) -> Vec<MatchedLine<'_>> {
        let needle = Folded::new(query);
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(i, range)| {
                let text = &self.text[range.clone()];
                if needle.text.is_empty() {
                    return Some(MatchedLine {
                        number: i + 1,
                        text,
                        ranges: Vec::new(),
                    });
                }
                let ranges = find_matches(text, &needle);
                (!ranges.is_empty()).then_some(MatchedLine {
                    number: i + 1,
                    text,
                    ranges,
                })
            })
            .collect()
    }
}
