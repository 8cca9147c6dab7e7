//! Translation orchestrator: chunk, translate, reassemble.
//!
//! ```text
//! SegmentedDocument ─▶ Chunker (body, trailing body) ─▶ translate each chunk
//!        │                                                  │
//!        │ title, reference_block                           ▼
//!        └──────────────────────────────▶ reassemble ─▶ restore images
//! ```
//!
//! A chunk whose translation fails contributes its original text, so the
//! output is always complete even when it is only partly translated. Results
//! are put back in chunk-index order before reassembly regardless of the
//! order in which translate calls finished.

use crate::config::TranslationConfig;
use crate::output::ChunkResult;
use crate::pipeline::chunk::{ChunkSection, Chunker};
use crate::pipeline::images::{self, PlaceholderMap};
use crate::pipeline::segment::SegmentedDocument;
use crate::pipeline::translate::Translator;
use crate::stream::chunk_stream;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{info, warn};

/// A reassembled translation and the per-chunk records behind it.
#[derive(Debug, Clone, Default)]
pub struct TranslatedDocument {
    /// Translated Markdown with images restored.
    pub markdown: String,
    /// Per-chunk results, sorted by chunk index.
    pub chunks: Vec<ChunkResult>,
    /// Placeholders missing from the translation.
    pub lost_images: usize,
}

/// Translate the body and trailing body of `doc` and reassemble the document.
///
/// `doc` must already have its images replaced by placeholders (see
/// [`images::extract`]); `placeholders` is the matching map and is used to
/// restore them in the output.
pub async fn translate_document(
    doc: &SegmentedDocument,
    placeholders: &PlaceholderMap,
    chunker: &Chunker,
    translator: Arc<dyn Translator>,
    config: &TranslationConfig,
) -> TranslatedDocument {
    let plan = chunker.plan(doc);
    let total = plan.chunks.len();
    info!(
        "Translating {} chunks ({} body, {} trailing)",
        total,
        plan.body_count,
        total - plan.body_count
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_translation_start(total);
    }

    let mut chunks: Vec<ChunkResult> = chunk_stream(plan.chunks, translator, config)
        .collect()
        .await;
    chunks.sort_by_key(|c| c.index);

    let translated = chunks.iter().filter(|c| c.outcome.is_translated()).count();
    if translated < total {
        warn!(
            "{} of {} chunks kept their original text",
            total - translated,
            total
        );
    }
    if let Some(ref cb) = config.progress_callback {
        cb.on_translation_complete(total, translated);
    }

    let body = join_section(&chunks, ChunkSection::Body);
    let trailing = join_section(&chunks, ChunkSection::Trailing);
    let reassembled = SegmentedDocument::assemble(
        doc.title.as_deref(),
        &body,
        doc.reference_block.as_deref(),
        &trailing,
    );

    let lost_images = placeholders.missing_in(&reassembled).len();
    TranslatedDocument {
        markdown: images::restore(&reassembled, placeholders),
        chunks,
        lost_images,
    }
}

/// Join the texts of one section's chunks with a newline.
fn join_section(chunks: &[ChunkResult], section: ChunkSection) -> String {
    chunks
        .iter()
        .filter(|c| c.section == section)
        .map(|c| c.text())
        .collect::<Vec<_>>()
        .join("\n")
}
