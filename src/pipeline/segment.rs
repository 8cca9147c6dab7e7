//! Document segmentation: title, body, reference block, trailing body.
//!
//! Academic papers end with a bibliography that should not go through the
//! translator (author names, venues and DOIs are better left as-is). The
//! segmenter finds the title line and the first "References" heading so the
//! orchestrator can translate everything else and splice those parts back in
//! their original positions.
//!
//! ```text
//! (discarded preamble)
//! # Title                 ─▶ title
//! …                       ─▶ body
//! ## References           ─┐
//! [1] …                    ├▶ reference_block
//! [2] …                   ─┘
//! # Appendix              ─┐
//! …                        ├▶ trailing_body
//! ```

use crate::pipeline::markdown::{
    break_before_citations, is_heading, is_reference_heading, is_title_heading,
};
use serde::{Deserialize, Serialize};

/// Structural decomposition of a Markdown document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentedDocument {
    /// The first `# ` heading line, trimmed.
    pub title: Option<String>,
    /// Everything between the title and the reference heading.
    pub body: String,
    /// The reference heading and its entries, one citation per line.
    pub reference_block: Option<String>,
    /// Content after the reference block, starting at the next heading.
    pub trailing_body: String,
}

impl SegmentedDocument {
    /// Reassemble the parts in document order, separated by blank lines.
    ///
    /// Absent or empty parts are skipped so no stray blank lines appear.
    pub fn assemble(
        title: Option<&str>,
        body: &str,
        reference_block: Option<&str>,
        trailing_body: &str,
    ) -> String {
        [title, Some(body), reference_block, Some(trailing_body)]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The document rebuilt from its own parts.
    pub fn to_markdown(&self) -> String {
        Self::assemble(
            self.title.as_deref(),
            &self.body,
            self.reference_block.as_deref(),
            &self.trailing_body,
        )
    }
}

/// Split `markdown` into title, body, reference block and trailing body.
///
/// The reference heading is looked for only after the title line; anything
/// before the title is dropped. Only the first reference heading counts.
pub fn segment(markdown: &str) -> SegmentedDocument {
    let lines: Vec<&str> = markdown.split('\n').collect();

    let (title, body_start) = match lines.iter().position(|l| is_title_heading(l)) {
        Some(i) => (Some(lines[i].trim().to_string()), i + 1),
        None => (None, 0),
    };

    let reference_start = lines
        .iter()
        .enumerate()
        .skip(body_start)
        .find(|(_, l)| is_reference_heading(l))
        .map(|(i, _)| i);

    let Some(reference_start) = reference_start else {
        return SegmentedDocument {
            title,
            body: join_trimmed(&lines[body_start..]),
            reference_block: None,
            trailing_body: String::new(),
        };
    };

    let next_header = lines
        .iter()
        .enumerate()
        .skip(reference_start + 1)
        .find(|(_, l)| is_heading(l))
        .map(|(i, _)| i)
        .unwrap_or(lines.len());

    let references = join_trimmed(&lines[reference_start..next_header]);

    SegmentedDocument {
        title,
        body: join_trimmed(&lines[body_start..reference_start]),
        reference_block: Some(break_before_citations(&references)),
        trailing_body: join_trimmed(&lines[next_header..]),
    }
}

fn join_trimmed(lines: &[&str]) -> String {
    lines.join("\n").trim().to_string()
}
