//! Error types for the paperglance library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`TranslateError`] — **Fatal**: the run cannot proceed at all (missing
//!   source file, missing OCR credential, OCR call failed, provider not
//!   configured). Returned as `Err(TranslateError)` from the top-level
//!   `convert*` functions. No output is written for the stage that failed.
//!
//! * [`ChunkError`] — **Non-fatal**: translating a single chunk failed
//!   (transient API error, timeout). The orchestrator substitutes the original
//!   chunk text and keeps going; the error is stored inside
//!   [`crate::pipeline::translate::ChunkOutcome::Failed`] so callers can see
//!   which parts of the document stayed untranslated.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the paperglance library.
///
/// Per-chunk translation failures use [`ChunkError`] and never surface here.
#[derive(Debug, Error)]
pub enum TranslateError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Source file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// A required API credential is absent from config and environment.
    #[error("Missing credential: set {var}")]
    MissingCredential { var: String },

    /// Upload, signed-URL or OCR request failed.
    #[error("OCR request '{stage}' failed: {reason}")]
    OcrRequestFailed { stage: String, reason: String },

    /// The OCR service answered, but the body could not be understood.
    #[error("OCR response could not be parsed: {detail}")]
    OcrResponseInvalid { detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error for a translate call.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not read a Markdown input file.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single chunk.
///
/// The chunk's original text is kept in the output in its place.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ChunkError {
    /// Every attempt to translate the chunk returned an error.
    #[error("Chunk {chunk}: translation failed after {attempts} attempt(s): {detail}")]
    TranslationFailed {
        chunk: usize,
        attempts: u32,
        detail: String,
    },

    /// The translate call did not answer within the configured timeout.
    #[error("Chunk {chunk}: translation timed out after {secs}s")]
    Timeout { chunk: usize, secs: u64 },
}
