//! Text location: finding literal occurrences of reference strings and
//! turning them into addressable, highlight-safe character spans.
//!
//! Matching is literal substring search, never regex - reference text comes
//! straight from user selections and must not be interpreted.

use serde::{Deserialize, Serialize};

/// Maximum length of the diagnostic context line carried on each span.
pub const CONTEXT_LINE_MAX: usize = 100;

/// A located occurrence of a reference string.
///
/// `char_start`/`char_end` are byte offsets into the whole document text
/// (prior line lengths plus one newline each, plus the in-line offset).
/// `line_char_start`/`line_char_end` are offsets within the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub document: String,
    pub line_index: usize,
    pub char_start: usize,
    pub char_end: usize,
    pub line_char_start: usize,
    pub line_char_end: usize,
    pub text: String,
    pub context_line: String,
}

impl Span {
    /// True if `other`'s interval strictly contains this span's interval.
    fn contained_in(&self, other: &Span) -> bool {
        (other.char_start, other.char_end) != (self.char_start, self.char_end)
            && other.char_start <= self.char_start
            && other.char_end >= self.char_end
    }
}

/// Find every occurrence of `needle` in `text`.
///
/// Degenerate inputs (empty text or needle) return an empty list rather than
/// erroring - this feeds a highlighting aid, not a parser. The scan resumes
/// one character past each match start, so overlapping occurrences are all
/// reported: `locate("aaa", "aa", _)` yields spans at offsets 0 and 1.
pub fn locate(text: &str, needle: &str, document: &str) -> Vec<Span> {
    if text.is_empty() || needle.is_empty() {
        return Vec::new();
    }

    let mut spans = Vec::new();
    let mut line_offset = 0usize;

    for (line_index, line) in text.split('\n').enumerate() {
        let mut from = 0usize;
        while let Some(rel) = line[from..].find(needle) {
            let pos = from + rel;
            let char_start = line_offset + pos;
            spans.push(Span {
                document: document.to_string(),
                line_index,
                char_start,
                char_end: char_start + needle.len(),
                line_char_start: pos,
                line_char_end: pos + needle.len(),
                text: needle.to_string(),
                context_line: truncate_context(line),
            });
            // Advance by one character (not one match length) so adjacent and
            // overlapping occurrences are found. Stays on a UTF-8 boundary.
            from = pos + char_width(line, pos);
        }
        line_offset += line.len() + 1;
    }

    spans
}

/// Byte width of the character starting at `at`.
fn char_width(s: &str, at: usize) -> usize {
    s[at..].chars().next().map(|c| c.len_utf8()).unwrap_or(1)
}

fn truncate_context(line: &str) -> String {
    line.chars().take(CONTEXT_LINE_MAX).collect()
}

/// Remove spans strictly contained in another span, then sort descending by
/// `char_start` so markup can be applied outside-in without invalidating
/// earlier offsets.
///
/// Identical duplicate spans (two references matching the same text) are
/// retained; consumers of the result must tolerate re-application.
pub fn dedupe(spans: Vec<Span>) -> Vec<Span> {
    let mut kept: Vec<Span> = spans
        .iter()
        .filter(|s| !spans.iter().any(|other| s.contained_in(other)))
        .cloned()
        .collect();
    kept.sort_by(|a, b| b.char_start.cmp(&a.char_start).then(b.char_end.cmp(&a.char_end)));
    kept
}

/// Splice `open`/`close` markers around each span, processing from the
/// highest `char_start` down so earlier insertions never shift later offsets.
///
/// Out-of-range spans are skipped; identical duplicate intervals are applied
/// once.
pub fn apply_marks(text: &str, spans: &[Span], open: &str, close: &str) -> String {
    let ordered = dedupe(spans.to_vec());
    let mut result = text.to_string();
    let mut last_applied: Option<(usize, usize)> = None;

    for span in &ordered {
        let interval = (span.char_start, span.char_end);
        if last_applied == Some(interval) {
            continue;
        }
        if span.char_start >= span.char_end
            || span.char_end > text.len()
            || !text.is_char_boundary(span.char_start)
            || !text.is_char_boundary(span.char_end)
        {
            continue;
        }
        result = format!(
            "{}{}{}{}{}",
            &result[..span.char_start],
            open,
            &result[span.char_start..span.char_end],
            close,
            &result[span.char_end..],
        );
        last_applied = Some(interval);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> Span {
        Span {
            document: "test.md".to_string(),
            line_index: 0,
            char_start: start,
            char_end: end,
            line_char_start: start,
            line_char_end: end,
            text: String::new(),
            context_line: String::new(),
        }
    }

    #[test]
    fn test_locate_empty_inputs() {
        assert!(locate("", "x", "d").is_empty());
        assert!(locate("some text", "", "d").is_empty());
    }

    #[test]
    fn test_locate_overlapping_occurrences() {
        let spans = locate("aaa", "aa", "d");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].char_start, 0);
        assert_eq!(spans[1].char_start, 1);
    }

    #[test]
    fn test_locate_offsets_across_lines() {
        let text = "Event: Acme Corp\nHost: Acme Corp";
        let spans = locate(text, "Acme Corp", "d");
        assert_eq!(spans.len(), 2);

        assert_eq!(spans[0].line_index, 0);
        assert_eq!(spans[0].char_start, 7);
        assert_eq!(spans[0].char_end, 16);
        assert_eq!(spans[0].line_char_start, 7);

        // Second line starts at 17 (16 chars + newline).
        assert_eq!(spans[1].line_index, 1);
        assert_eq!(spans[1].char_start, 23);
        assert_eq!(spans[1].line_char_start, 6);
        assert_eq!(&text[spans[1].char_start..spans[1].char_end], "Acme Corp");
    }

    #[test]
    fn test_locate_count_matches_naive_scan() {
        let text = "abcabcabc\nxabcx";
        let needle = "abc";
        let naive = (0..text.len())
            .filter(|&p| text[p..].starts_with(needle))
            .count();
        assert_eq!(locate(text, needle, "d").len(), naive);
    }

    #[test]
    fn test_locate_is_case_sensitive() {
        assert!(locate("Acme", "acme", "d").is_empty());
        assert_eq!(locate("Acme", "Acme", "d").len(), 1);
    }

    #[test]
    fn test_locate_multibyte_text() {
        let text = "café café";
        let spans = locate(text, "café", "d");
        assert_eq!(spans.len(), 2);
        for s in &spans {
            assert_eq!(&text[s.char_start..s.char_end], "café");
        }
    }

    #[test]
    fn test_context_line_truncated() {
        let long_line = "x".repeat(250);
        let spans = locate(&long_line, "x", "d");
        assert_eq!(spans[0].context_line.chars().count(), CONTEXT_LINE_MAX);
    }

    #[test]
    fn test_dedupe_removes_contained() {
        let spans = vec![span(0, 10), span(2, 5)];
        let result = dedupe(spans);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].char_start, 0);
    }

    #[test]
    fn test_dedupe_keeps_identical_duplicates() {
        let spans = vec![span(3, 8), span(3, 8)];
        assert_eq!(dedupe(spans).len(), 2);
    }

    #[test]
    fn test_dedupe_keeps_partial_overlap() {
        // Neither interval contains the other.
        let spans = vec![span(0, 5), span(3, 9)];
        assert_eq!(dedupe(spans).len(), 2);
    }

    #[test]
    fn test_dedupe_sorted_descending() {
        let spans = vec![span(1, 2), span(9, 12), span(4, 6)];
        let result = dedupe(spans);
        let starts: Vec<usize> = result.iter().map(|s| s.char_start).collect();
        assert_eq!(starts, vec![9, 4, 1]);
    }

    #[test]
    fn test_dedupe_idempotent() {
        let spans = vec![span(0, 10), span(2, 5), span(3, 8), span(0, 10)];
        let once = dedupe(spans);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_dedupe_no_strict_subset_remains() {
        let spans = vec![span(0, 4), span(1, 3), span(2, 8), span(5, 6)];
        let result = dedupe(spans);
        for s in &result {
            assert!(
                !result.iter().any(|other| s.contained_in(other)),
                "span {:?} still contained after dedupe",
                (s.char_start, s.char_end)
            );
        }
    }

    #[test]
    fn test_apply_marks_outside_in() {
        let text = "Event: Acme Corp\nHost: Acme Corp";
        let spans = locate(text, "Acme Corp", "d");
        let marked = apply_marks(text, &spans, "<mark>", "</mark>");
        assert_eq!(
            marked,
            "Event: <mark>Acme Corp</mark>\nHost: <mark>Acme Corp</mark>"
        );
    }

    #[test]
    fn test_apply_marks_skips_out_of_range() {
        let spans = vec![span(0, 999)];
        assert_eq!(apply_marks("short", &spans, "[", "]"), "short");
    }

    #[test]
    fn test_apply_marks_duplicate_interval_once() {
        let spans = vec![span(0, 3), span(0, 3)];
        assert_eq!(apply_marks("abc", &spans, "[", "]"), "[abc]");
    }
}
