//! # paperglance
//!
//! Turn a scanned PDF paper into translated Markdown: Mistral OCR for the
//! text and figures, any chat LLM for the translation.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. OCR        upload + Mistral OCR → per-page Markdown and images
//!  ├─ 2. Assemble   inline images, join pages
//!  ├─ 3. Protect    images → {IMAGE_<i>}, title and references set aside
//!  ├─ 4. Chunk      section → paragraph → sentence, within a token budget
//!  ├─ 5. Translate  one LLM call per chunk; a failed chunk keeps its original
//!  └─ 6. Reassemble title + body + references + trailing body, images restored
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paperglance::{convert_to_files, TranslationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // OCR key from MISTRALAI_API_KEY, translator from OPENAI_API_KEY etc.
//!     let config = TranslationConfig::builder()
//!         .target_language("Japanese")
//!         .build()?;
//!     let output = convert_to_files(
//!         "paper.pdf",
//!         "output/paper.md",
//!         "output/paper_translated.md",
//!         &config,
//!     )
//!     .await?;
//!     eprintln!(
//!         "{}/{} chunks translated",
//!         output.stats.translated_chunks, output.stats.total_chunks
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paperglance` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! paperglance = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    PageSelection, PageSeparator, TranslationConfig, TranslationConfigBuilder,
};
pub use convert::{
    convert, convert_sync, convert_to_files, convert_with, translate_file, translate_markdown,
    translate_with,
};
pub use error::{ChunkError, TranslateError};
pub use output::{ChunkResult, TranslationOutput, TranslationStats};
pub use pipeline::chunk::{Chunker, PlannedChunk};
pub use pipeline::input::DocumentSource;
pub use pipeline::ocr::{MistralOcr, OcrImage, OcrPage, OcrService};
pub use pipeline::segment::SegmentedDocument;
pub use pipeline::tokens::{TiktokenCounter, TokenCounter};
pub use pipeline::translate::{ChunkOutcome, Completion, LlmTranslator, Translator};
pub use progress::{NoopProgressCallback, ProgressCallback, TranslationProgressCallback};
pub use stream::{chunk_stream, translate_stream, ChunkStream};
