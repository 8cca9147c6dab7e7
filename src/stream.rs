//! Streaming translation API: emit chunk results as they complete.
//!
//! The eager [`crate::convert::convert`] returns only once every chunk is
//! translated and the document is reassembled. [`translate_stream`] instead
//! yields a [`ChunkResult`] per chunk as soon as its translate call resolves,
//! which suits progress displays and incremental writers.
//!
//! With `concurrency > 1` results arrive in completion order, not chunk
//! order. Sort by [`ChunkResult::index`] if order matters; the orchestrator
//! always does.

use crate::config::TranslationConfig;
use crate::convert::resolve_translation;
use crate::error::TranslateError;
use crate::output::ChunkResult;
use crate::pipeline::chunk::{Chunker, PlannedChunk};
use crate::pipeline::translate::{translate_chunk, Translator};
use crate::pipeline::{images, segment};
use crate::prompts::translation_instruction;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-chunk results.
pub type ChunkStream = Pin<Box<dyn Stream<Item = ChunkResult> + Send>>;

/// Translate already-planned chunks, yielding each result as it resolves.
///
/// At most `config.concurrency` translate calls are in flight at once.
/// Per-chunk progress events fire from inside the stream.
pub fn chunk_stream(
    chunks: Vec<PlannedChunk>,
    translator: Arc<dyn Translator>,
    config: &TranslationConfig,
) -> ChunkStream {
    let total = chunks.len();
    let concurrency = config.concurrency.max(1);
    let instruction: Arc<str> = Arc::from(translation_instruction(config));
    let config_clone = config.clone();

    let s = stream::iter(chunks.into_iter().map(move |chunk| {
        let translator = Arc::clone(&translator);
        let instruction = Arc::clone(&instruction);
        let cfg = config_clone.clone();
        async move {
            let number = chunk.index + 1;
            if let Some(ref cb) = cfg.progress_callback {
                cb.on_chunk_start(number, total);
            }

            let start = Instant::now();
            let (outcome, retries) =
                translate_chunk(translator.as_ref(), &instruction, &chunk, &cfg).await;

            if let Some(ref cb) = cfg.progress_callback {
                match outcome.error() {
                    None => cb.on_chunk_complete(number, total, outcome.text().len()),
                    Some(e) => cb.on_chunk_error(number, total, &e.to_string()),
                }
            }

            ChunkResult {
                index: chunk.index,
                section: chunk.section,
                source_tokens: chunk.tokens,
                duration_ms: start.elapsed().as_millis() as u64,
                retries,
                outcome,
            }
        }
    }))
    .buffer_unordered(concurrency);

    Box::pin(s)
}

/// Translate a Markdown document, streaming chunk results as they are ready.
///
/// Image markups are replaced by `{IMAGE_<i>}` placeholders and the title and
/// reference block are set aside before chunking, so streamed chunk texts
/// contain placeholders rather than images. Use
/// [`crate::convert::translate_markdown`] to get the reassembled document.
///
/// # Errors
/// Returns `Err(TranslateError)` when no LLM provider can be resolved.
pub async fn translate_stream(
    markdown: &str,
    config: &TranslationConfig,
) -> Result<ChunkStream, TranslateError> {
    let (translator, counter) = resolve_translation(config)?;
    let chunker = Chunker::new(counter, config.token_budget);

    let (extracted, _) = images::extract(markdown);
    let doc = segment::segment(&extracted);
    let plan = chunker.plan(&doc);
    info!("Streaming translation of {} chunks", plan.chunks.len());

    Ok(chunk_stream(plan.chunks, translator, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::chunk::ChunkSection;
    use crate::pipeline::translate::Completion;
    use crate::progress::TranslationProgressCallback;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Upper;

    #[async_trait]
    impl Translator for Upper {
        async fn translate(&self, _: &str, chunk: &str) -> Result<Completion, TranslateError> {
            // Earlier chunks take longer so completion order is reversed.
            let delay = 40u64.saturating_sub(chunk.len() as u64 * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(Completion::text(chunk.to_uppercase()))
        }
    }

    #[derive(Default)]
    struct Counting {
        started: AtomicUsize,
        completed: AtomicUsize,
    }

    impl TranslationProgressCallback for Counting {
        fn on_chunk_start(&self, _: usize, _: usize) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        fn on_chunk_complete(&self, _: usize, _: usize, _: usize) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn planned(texts: &[&str]) -> Vec<PlannedChunk> {
        texts
            .iter()
            .enumerate()
            .map(|(index, t)| PlannedChunk {
                index,
                section: ChunkSection::Body,
                text: t.to_string(),
                tokens: 1,
            })
            .collect()
    }

    #[tokio::test]
    async fn yields_every_chunk_and_fires_callbacks() {
        let cb = Arc::new(Counting::default());
        let config = TranslationConfig::builder()
            .concurrency(3)
            .progress_callback(cb.clone())
            .build()
            .unwrap();

        let mut results: Vec<ChunkResult> =
            chunk_stream(planned(&["a", "bb", "ccc"]), Arc::new(Upper), &config)
                .collect()
                .await;
        assert_eq!(results.len(), 3);
        assert_eq!(cb.started.load(Ordering::SeqCst), 3);
        assert_eq!(cb.completed.load(Ordering::SeqCst), 3);

        results.sort_by_key(|r| r.index);
        let texts: Vec<&str> = results.iter().map(|r| r.text()).collect();
        assert_eq!(texts, ["A", "BB", "CCC"]);
    }

    #[tokio::test]
    async fn sequential_by_default_preserves_order() {
        let config = TranslationConfig::default();
        let results: Vec<ChunkResult> =
            chunk_stream(planned(&["a", "bb", "ccc"]), Arc::new(Upper), &config)
                .collect()
                .await;
        let indices: Vec<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, [0, 1, 2]);
    }
}
