//! Structural predicates over Markdown text.
//!
//! Each pattern the segmenter, chunker and image codec rely on lives here as
//! its own named predicate or extractor, so it can be tested in isolation.
//! All patterns are line-oriented and flat: no nesting is understood.
//!
//! Known limitations:
//! - image alt text containing `]` or URLs containing `)` are cut short;
//! - sentence boundaries also fire after abbreviations and inside decimals
//!   that are followed by whitespace ("Fig. 2", "approx. 3").

use once_cell::sync::Lazy;
use regex::Regex;

static RE_REFERENCE_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^#{1,2} References").unwrap());

static RE_ANY_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6} ").unwrap());

static RE_SECTION_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^# ").unwrap());

/// Flat, non-greedy `![alt](target)` image markup.
pub static RE_IMAGE_MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[.*?\]\(.*?\)").unwrap());

static RE_CITATION_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+\]").unwrap());

static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

static RE_LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*").unwrap());

/// A document title: a level-1 heading (`# ` at line start).
pub fn is_title_heading(line: &str) -> bool {
    line.starts_with("# ")
}

/// A level-1 or level-2 heading whose text begins with "References",
/// case-insensitively. `### References` deliberately does not qualify.
pub fn is_reference_heading(line: &str) -> bool {
    RE_REFERENCE_HEADING.is_match(line)
}

/// Any ATX heading of level 1–6.
pub fn is_heading(line: &str) -> bool {
    RE_ANY_HEADING.is_match(line)
}

/// Byte offsets where a level-1 section heading line starts.
pub fn section_starts(text: &str) -> Vec<usize> {
    RE_SECTION_HEADING.find_iter(text).map(|m| m.start()).collect()
}

/// Byte offsets just past each paragraph break (a newline plus any following
/// whitespace, so blank lines belong to the preceding paragraph).
pub fn paragraph_ends(text: &str) -> Vec<usize> {
    RE_LINE_BREAK.find_iter(text).map(|m| m.end()).collect()
}

/// Byte offsets just past each sentence boundary (`.`, `!` or `?` followed by
/// whitespace, the whitespace included).
pub fn sentence_ends(text: &str) -> Vec<usize> {
    RE_SENTENCE_END.find_iter(text).map(|m| m.end()).collect()
}

/// Every image markup span in `text`, left to right.
pub fn image_markups(text: &str) -> impl Iterator<Item = &str> {
    RE_IMAGE_MARKUP.find_iter(text).map(|m| m.as_str())
}

/// Put every bracketed numeric citation marker (`[12]`) that is not already at
/// the start of a line onto a new line.
pub fn break_before_citations(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 64);
    let mut line_start = 0;
    let mut last = 0;

    for m in RE_CITATION_MARKER.find_iter(text) {
        let gap = &text[last..m.start()];
        out.push_str(gap);
        if let Some(nl) = gap.rfind('\n') {
            line_start = out.len() - gap.len() + nl + 1;
        }
        if !out[line_start..].trim().is_empty() {
            let kept = out.trim_end_matches([' ', '\t']).len();
            out.truncate(kept);
            out.push('\n');
            line_start = out.len();
        }
        out.push_str(m.as_str());
        last = m.end();
    }

    out.push_str(&text[last..]);
    out
}
