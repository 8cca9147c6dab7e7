//! Pipeline stages for PDF-to-translated-Markdown runs.
//!
//! Each submodule implements one transformation step. The text stages are
//! pure and synchronous; only [`ocr`] and [`translate`] do network I/O, and
//! both sit behind traits so the rest can be tested with fakes.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ ocr ──▶ assemble ──▶ images::extract ──▶ segment ──▶ chunk
//!                                                                  │
//!  images::restore ◀── orchestrate (reassemble) ◀── translate ◀────┘
//! ```
//!
//! 1. [`input`]    — validate a local PDF or accept a URL
//! 2. [`ocr`]      — Mistral OCR: per-page Markdown plus image payloads
//! 3. [`assemble`] — inline images, filter pages, join with a separator
//! 4. [`images`]   — swap image markups for `{IMAGE_<i>}` placeholders and back
//! 5. [`segment`]  — split off the title and reference block
//! 6. [`chunk`]    — token-bounded chunks, measured by [`tokens`]
//! 7. [`translate`] — one LLM call per chunk with retry; failures keep the original
//! 8. [`orchestrate`] — run all chunks and reassemble the document
//!
//! [`markdown`] holds the structural predicates used by stages 4–6, and
//! [`postprocess`] cleans LLM output and the final document.

pub mod assemble;
pub mod chunk;
pub mod images;
pub mod input;
pub mod markdown;
pub mod ocr;
pub mod orchestrate;
pub mod postprocess;
pub mod segment;
pub mod tokens;
pub mod translate;
