//! Progress-callback trait for per-chunk translation events.
//!
//! Inject an [`Arc<dyn TranslationProgressCallback>`] via
//! [`crate::config::TranslationConfigBuilder::progress_callback`] to receive
//! events as the orchestrator translates each chunk. The CLI uses this to drive
//! its progress bar; library callers can forward events anywhere.
//!
//! # Example
//!
//! ```rust
//! use paperglance::{TranslationProgressCallback, TranslationConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl TranslationProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, chunk: usize, total: usize, translated_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Chunk {}/{} done ({} bytes)", chunk, total, translated_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = TranslationConfig::builder()
//!     .progress_callback(counter as Arc<dyn TranslationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it translates each chunk.
///
/// Chunk numbers are 1-indexed. When `concurrency > 1` the chunk-level
/// methods may be called concurrently and out of order, so implementations
/// must protect shared mutable state (e.g. `Mutex`, `AtomicUsize`). All
/// methods default to no-ops.
pub trait TranslationProgressCallback: Send + Sync {
    /// Called once with the total number of chunks, before any translate call.
    fn on_translation_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// Called just before the translate request for a chunk is sent.
    fn on_chunk_start(&self, chunk: usize, total_chunks: usize) {
        let _ = (chunk, total_chunks);
    }

    /// Called when a chunk was translated.
    ///
    /// `translated_len` is the byte length of the translated text.
    fn on_chunk_complete(&self, chunk: usize, total_chunks: usize, translated_len: usize) {
        let _ = (chunk, total_chunks, translated_len);
    }

    /// Called when a chunk failed and its original text is kept instead.
    fn on_chunk_error(&self, chunk: usize, total_chunks: usize, error: &str) {
        let _ = (chunk, total_chunks, error);
    }

    /// Called once after every chunk has resolved.
    fn on_translation_complete(&self, total_chunks: usize, translated: usize) {
        let _ = (total_chunks, translated);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TranslationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TranslationConfig`].
pub type ProgressCallback = Arc<dyn TranslationProgressCallback>;
