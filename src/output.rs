//! Result types returned by the translation entry points.

use crate::error::ChunkError;
use crate::pipeline::chunk::ChunkSection;
use crate::pipeline::translate::ChunkOutcome;
use serde::{Deserialize, Serialize};

/// Everything a run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationOutput {
    /// Combined OCR Markdown with images inline, before translation.
    pub raw_markdown: String,
    /// Translated document with title, references and images restored.
    pub markdown: String,
    /// Per-chunk records, in chunk order.
    pub chunks: Vec<ChunkResult>,
    pub stats: TranslationStats,
}

/// Per-chunk record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkResult {
    /// 0-based chunk index across body and trailing body.
    pub index: usize,
    pub section: ChunkSection,
    /// Size of the source chunk in translation-model tokens.
    pub source_tokens: usize,
    pub duration_ms: u64,
    /// Retries spent on this chunk (0 when the first attempt decided it).
    pub retries: u32,
    pub outcome: ChunkOutcome,
}

impl ChunkResult {
    /// Text contributed to the reassembled document.
    pub fn text(&self) -> &str {
        self.outcome.text()
    }

    pub fn error(&self) -> Option<&ChunkError> {
        self.outcome.error()
    }
}

/// Aggregate figures for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationStats {
    /// Pages returned by OCR.
    pub total_pages: usize,
    /// Pages kept after page selection.
    pub selected_pages: usize,
    /// Image markups swapped for placeholders.
    pub images: usize,
    /// Placeholders the translation dropped; those images are missing from
    /// the output.
    pub lost_images: usize,
    pub total_chunks: usize,
    pub translated_chunks: usize,
    pub failed_chunks: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub translation_duration_ms: u64,
}

impl TranslationStats {
    /// Fill the chunk and token counters from per-chunk results.
    pub fn record_chunks(&mut self, chunks: &[ChunkResult]) {
        self.total_chunks = chunks.len();
        self.translated_chunks = chunks.iter().filter(|c| c.outcome.is_translated()).count();
        self.failed_chunks = self.total_chunks - self.translated_chunks;
        for chunk in chunks {
            if let ChunkOutcome::Translated {
                input_tokens,
                output_tokens,
                ..
            } = chunk.outcome
            {
                self.total_input_tokens += input_tokens as u64;
                self.total_output_tokens += output_tokens as u64;
            }
        }
    }
}
