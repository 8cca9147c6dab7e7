//! Token-bounded chunking of Markdown text.
//!
//! Text is packed greedily, left to right, into chunks whose token count stays
//! within the budget. Units are tried coarse to fine:
//!
//! ```text
//! Section   (`# ` heading + its text)   ── too big? ──▶ split into
//! Paragraph (line / blank-line runs)    ── too big? ──▶ split into
//! Sentence  (`.` `!` `?` + whitespace)  ── too big? ──▶ emitted alone, unsplit
//! ```
//!
//! Every unit is a contiguous span of the input, so a chunk is always an exact
//! slice of the original text (trimmed at both ends). Nothing is reordered,
//! dropped or duplicated.
//!
//! An oversized section starts a fresh chunk. Below section level the open
//! chunk carries into the finer stage, so a heading stays with as much of its
//! first paragraph as fits.
//!
//! Each unit is tokenised once. The open chunk keeps a running total, and the
//! chunk text is only re-counted exactly when that total, plus a small
//! allowance per join, comes near the budget. The final check is always
//! against the exact count, so the budget holds for tokenizers whose counts
//! are not additive.

use crate::pipeline::markdown::{paragraph_ends, section_starts, sentence_ends};
use crate::pipeline::segment::SegmentedDocument;
use crate::pipeline::tokens::TokenCounter;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, warn};

/// Unit size a stage splits text into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Level-1 heading sections; the heading travels with its text.
    Section,
    /// Lines, with trailing blank lines attached.
    Paragraph,
    /// Sentences ending in `.`, `!` or `?` followed by whitespace.
    Sentence,
}

impl Granularity {
    /// Offsets inside `text` where a new unit begins.
    fn cuts(self, text: &str) -> Vec<usize> {
        match self {
            Granularity::Section => section_starts(text),
            Granularity::Paragraph => paragraph_ends(text),
            Granularity::Sentence => sentence_ends(text),
        }
    }

    /// Whether an oversized unit of this size closes the open chunk before
    /// being split further.
    fn starts_fresh_chunk(self) -> bool {
        matches!(self, Granularity::Section)
    }
}

/// One step of the splitting pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub granularity: Granularity,
    /// Units of an atomic stage are never split further, even over budget.
    pub atomic: bool,
}

impl Stage {
    pub const fn new(granularity: Granularity, atomic: bool) -> Self {
        Self { granularity, atomic }
    }

    /// Section → paragraph → sentence, sentences atomic.
    pub fn default_pipeline() -> Vec<Stage> {
        vec![
            Stage::new(Granularity::Section, false),
            Stage::new(Granularity::Paragraph, false),
            Stage::new(Granularity::Sentence, true),
        ]
    }
}

/// Which part of the segmented document a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkSection {
    Body,
    Trailing,
}

/// A chunk ready to be sent to the translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedChunk {
    /// 0-based position across body and trailing chunks.
    pub index: usize,
    pub section: ChunkSection,
    pub text: String,
    pub tokens: usize,
}

/// All chunks of a document, body chunks first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunks: Vec<PlannedChunk>,
    /// Number of leading chunks that belong to the body.
    pub body_count: usize,
}

/// Splits text into chunks of at most `budget` tokens.
#[derive(Clone)]
pub struct Chunker {
    counter: Arc<dyn TokenCounter>,
    budget: usize,
    stages: Vec<Stage>,
}

impl std::fmt::Debug for Chunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunker")
            .field("budget", &self.budget)
            .field("stages", &self.stages)
            .finish()
    }
}

impl Chunker {
    pub fn new(counter: Arc<dyn TokenCounter>, budget: usize) -> Self {
        Self {
            counter,
            budget,
            stages: Stage::default_pipeline(),
        }
    }

    /// Replace the splitting pipeline. An empty pipeline keeps the default.
    pub fn with_stages(mut self, stages: Vec<Stage>) -> Self {
        if !stages.is_empty() {
            self.stages = stages;
        }
        self
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn count(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// Split `text` into ordered chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut packer = Packer {
            text,
            chunker: self,
            open: None,
            chunks: Vec::new(),
        };
        packer.pack(0..text.len(), 0);
        packer.flush();
        packer.chunks
    }

    /// Chunk the body and trailing body of a document independently.
    pub fn plan(&self, doc: &SegmentedDocument) -> ChunkPlan {
        let body = self.split(&doc.body);
        let trailing = self.split(&doc.trailing_body);
        let body_count = body.len();

        let chunks: Vec<PlannedChunk> = body
            .into_iter()
            .map(|t| (ChunkSection::Body, t))
            .chain(trailing.into_iter().map(|t| (ChunkSection::Trailing, t)))
            .enumerate()
            .map(|(index, (section, text))| PlannedChunk {
                index,
                section,
                tokens: self.count(&text),
                text,
            })
            .collect();

        debug!(
            "Planned {} chunks ({} body, {} trailing), budget {}",
            chunks.len(),
            body_count,
            chunks.len() - body_count,
            self.budget
        );

        ChunkPlan { chunks, body_count }
    }
}

/// Tokens a join between two units may add over the sum of their counts.
const JOIN_SLACK: usize = 2;

/// The chunk being filled.
#[derive(Debug, Clone)]
struct OpenChunk {
    span: Range<usize>,
    /// Exact count at the last re-count plus the counts of units added since.
    tokens: usize,
    /// Units added since the last exact count.
    joins: usize,
}

/// Greedy packing state shared across recursion levels.
struct Packer<'a> {
    text: &'a str,
    chunker: &'a Chunker,
    open: Option<OpenChunk>,
    chunks: Vec<String>,
}

impl Packer<'_> {
    fn pack(&mut self, span: Range<usize>, depth: usize) {
        let stage = self.chunker.stages[depth];
        let has_next = depth + 1 < self.chunker.stages.len();

        for unit in self.units(span, stage.granularity) {
            if self.text[unit.clone()].trim().is_empty() {
                continue;
            }

            let unit_tokens = self.chunker.count(&self.text[unit.clone()]);

            if let Some(open) = &self.open {
                let grown = OpenChunk {
                    span: open.span.start..unit.end,
                    tokens: open.tokens + unit_tokens,
                    joins: open.joins + 1,
                };
                if let Some(grown) = self.fit(grown) {
                    self.open = Some(grown);
                    continue;
                }
            }

            let alone = OpenChunk {
                span: unit.clone(),
                tokens: unit_tokens,
                joins: 0,
            };
            if let Some(alone) = self.fit(alone) {
                self.flush();
                self.open = Some(alone);
                continue;
            }

            if stage.atomic || !has_next {
                self.flush();
                let piece = self.text[unit].trim();
                warn!(
                    "{:?} of {} tokens exceeds budget {}; sending it unsplit",
                    stage.granularity,
                    self.chunker.count(piece),
                    self.chunker.budget
                );
                self.chunks.push(piece.to_string());
                continue;
            }

            if stage.granularity.starts_fresh_chunk() {
                self.flush();
            }
            self.pack(unit, depth + 1);
        }
    }

    /// Contiguous sub-spans of `span` cut at the granularity's boundaries.
    fn units(&self, span: Range<usize>, granularity: Granularity) -> Vec<Range<usize>> {
        let slice = &self.text[span.clone()];
        let mut units = Vec::new();
        let mut start = span.start;
        for cut in granularity.cuts(slice) {
            let at = span.start + cut;
            if at > start && at < span.end {
                units.push(start..at);
                start = at;
            }
        }
        units.push(start..span.end);
        units
    }

    /// `chunk` if it stays within budget, with its count made exact whenever
    /// the running estimate alone cannot tell.
    fn fit(&self, chunk: OpenChunk) -> Option<OpenChunk> {
        let budget = self.chunker.budget;
        if chunk.tokens + chunk.joins * JOIN_SLACK <= budget {
            return Some(chunk);
        }
        let exact = self.chunker.count(self.text[chunk.span.clone()].trim());
        (exact <= budget).then_some(OpenChunk {
            tokens: exact,
            joins: 0,
            ..chunk
        })
    }

    fn flush(&mut self) {
        if let Some(open) = self.open.take() {
            let piece = self.text[open.span].trim();
            if !piece.is_empty() {
                self.chunks.push(piece.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::segment::segment;

    /// One token per whitespace-separated word.
    struct WordCounter;

    impl TokenCounter for WordCounter {
        fn count(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    fn chunker(budget: usize) -> Chunker {
        Chunker::new(Arc::new(WordCounter), budget)
    }

    fn normalise(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn sentence(words: usize, tag: usize) -> String {
        let mut s = vec![format!("s{tag}")];
        s.extend(std::iter::repeat_n("word".to_string(), words.saturating_sub(2)));
        s.push("end.".to_string());
        s.join(" ")
    }

    #[test]
    fn empty_and_blank_input_give_no_chunks() {
        assert!(chunker(10).split("").is_empty());
        assert!(chunker(10).split("  \n\n \t").is_empty());
    }

    #[test]
    fn small_text_is_one_chunk() {
        let chunks = chunker(100).split("\n# A\nHello there.\n");
        assert_eq!(chunks, vec!["# A\nHello there."]);
    }

    #[test]
    fn sections_packed_greedily() {
        let text = "# A\nx x x\n# B\ny y y\n# C\nz z z";
        let chunks = chunker(10).split(text);
        assert_eq!(chunks, vec!["# A\nx x x\n# B\ny y y", "# C\nz z z"]);
    }

    #[test]
    fn heading_with_long_paragraph_gives_two_chunks() {
        let paragraph: Vec<String> = (0..95).map(|i| sentence(100, i)).collect();
        let text = format!("# A\n\n{}", paragraph.join(" "));
        let c = chunker(8000);
        assert_eq!(c.count(&text), 9502);

        let chunks = c.split(&text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("# A\n\ns0 "));
        assert_eq!(c.count(&chunks[0]), 7902);
        assert!(chunks[0].ends_with("end."));
        assert!(chunks[1].starts_with("s79 "));
        assert_eq!(c.count(&chunks[1]), 1600);
    }

    #[test]
    fn oversized_section_starts_fresh_chunk() {
        let p = |tag: &str| format!("{tag} {tag} {tag} {tag} {tag}");
        let text = format!("# A\na b\n# B\n{}\n\n{}\n\n{}", p("p"), p("q"), p("r"));
        let chunks = chunker(10).split(&text);
        assert_eq!(
            chunks,
            vec![
                "# A\na b".to_string(),
                format!("# B\n{}", p("p")),
                format!("{}\n\n{}", p("q"), p("r")),
            ]
        );
    }

    #[test]
    fn oversized_sentence_is_its_own_chunk() {
        let long = sentence(30, 1);
        let text = format!("Short one. {long} Short two.");
        let chunks = chunker(10).split(&text);
        assert_eq!(chunks, vec!["Short one.".to_string(), long, "Short two.".to_string()]);
    }

    #[test]
    fn atomic_paragraph_stage_keeps_paragraphs_whole() {
        let long = (0..20).map(|i| format!("w{i}.")).collect::<Vec<_>>().join(" ");
        let text = format!("intro\n{long}\noutro");
        let c = chunker(5).with_stages(vec![
            Stage::new(Granularity::Section, false),
            Stage::new(Granularity::Paragraph, true),
        ]);
        assert_eq!(c.split(&text), vec!["intro".to_string(), long, "outro".to_string()]);
    }

    /// A mixed document: several sections, blank-line paragraphs of
    /// varying length, an oversized sentence and an image placeholder.
    /// Returns the document and every sentence it contains.
    fn sample_document() -> (String, Vec<String>) {
        let mut seed: u64 = 7;
        let mut next = |m: u64| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) % m
        };
        let mut doc = String::from("Preamble line before any heading.\n\n");
        let mut all = Vec::new();
        let mut tag = 0;
        for section in 0..6 {
            doc.push_str(&format!("# Section {section}\n\n"));
            for _ in 0..(1 + next(4)) {
                let count = 1 + next(6);
                let mut paragraph = Vec::new();
                for _ in 0..count {
                    tag += 1;
                    paragraph.push(sentence(3 + next(25) as usize, tag));
                }
                doc.push_str(&paragraph.join(" "));
                doc.push_str("\n\n");
                all.extend(paragraph);
            }
            if section == 3 {
                tag += 1;
                let long = sentence(80, tag);
                doc.push_str(&long);
                doc.push_str(" {IMAGE_0}\n\n");
                all.push(long);
            }
        }
        (doc, all)
    }

    #[test]
    fn budget_respected_except_single_sentences() {
        let (doc, _) = sample_document();
        let c = chunker(40);
        for chunk in c.split(&doc) {
            if c.count(&chunk) > 40 {
                assert!(
                    sentence_ends(&chunk).is_empty(),
                    "over-budget chunk holds more than one sentence: {chunk:?}"
                );
            }
        }
    }

    #[test]
    fn chunks_reproduce_input() {
        let (doc, _) = sample_document();
        for budget in [5, 17, 40, 200, 10_000] {
            let chunks = chunker(budget).split(&doc);
            assert_eq!(
                normalise(&chunks.join("\n")),
                normalise(&doc),
                "budget {budget}"
            );
        }
    }

    #[test]
    fn sentences_never_split() {
        let (doc, sentences) = sample_document();
        for budget in [5, 17, 40] {
            let chunks = chunker(budget).split(&doc);
            for s in &sentences {
                assert!(
                    chunks.iter().any(|c| c.contains(s.as_str())),
                    "budget {budget}: sentence split across chunks: {s:?}"
                );
            }
        }
    }

    #[test]
    fn plan_chunks_body_and_trailing_separately() {
        let doc = segment("# T\n\nBody one.\n\n# References\n[1] X.\n\n# Appendix\nTrailing text.");
        let plan = chunker(100).plan(&doc);
        assert_eq!(plan.body_count, 1);
        assert_eq!(plan.chunks.len(), 2);
        assert_eq!(plan.chunks[0].section, ChunkSection::Body);
        assert_eq!(plan.chunks[0].text, "Body one.");
        assert_eq!(plan.chunks[1].index, 1);
        assert_eq!(plan.chunks[1].section, ChunkSection::Trailing);
        assert_eq!(plan.chunks[1].text, "# Appendix\nTrailing text.");
        assert_eq!(plan.chunks[1].tokens, 4);
    }

    #[test]
    fn long_section_is_tokenised_in_linear_time() {
        /// Word counter that records how many bytes it was asked to count.
        #[derive(Default)]
        struct Metered {
            bytes: std::sync::atomic::AtomicUsize,
        }

        impl TokenCounter for Metered {
            fn count(&self, text: &str) -> usize {
                self.bytes
                    .fetch_add(text.len(), std::sync::atomic::Ordering::Relaxed);
                text.split_whitespace().count()
            }
        }

        let lines: Vec<String> = (0..2000).map(|i| format!("l{i} a b c d.")).collect();
        let text = format!("# Intro\n{}", lines.join("\n"));
        let metered = Arc::new(Metered::default());
        let c = Chunker::new(metered.clone(), 500);

        let chunks = c.split(&text);

        assert!(chunks.len() >= 20);
        assert!(chunks.iter().all(|ch| WordCounter.count(ch) <= 500));
        assert_eq!(normalise(&chunks.join(" ")), normalise(&text));
        let counted = metered.bytes.load(std::sync::atomic::Ordering::Relaxed);
        assert!(
            counted < 12 * text.len(),
            "counted {counted} bytes for a {} byte input",
            text.len()
        );
    }
}
