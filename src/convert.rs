//! Eager (full-document) entry points.
//!
//! These functions wait for OCR and every translate call, then return the
//! reassembled document. Use [`crate::stream::translate_stream`] to receive
//! chunk results as they complete instead.
//!
//! ## Stages
//!
//! ```text
//! input ─▶ OCR ─▶ assemble pages ─▶ extract images ─▶ segment
//!                                                       │
//!       restore images ◀─ reassemble ◀─ translate ◀─ chunk
//! ```

use crate::config::TranslationConfig;
use crate::error::TranslateError;
use crate::output::{TranslationOutput, TranslationStats};
use crate::pipeline::assemble::assemble_pages;
use crate::pipeline::chunk::Chunker;
use crate::pipeline::input::{self, DocumentSource};
use crate::pipeline::ocr::{MistralOcr, OcrService};
use crate::pipeline::orchestrate::translate_document;
use crate::pipeline::tokens::{TiktokenCounter, TokenCounter};
use crate::pipeline::translate::{LlmTranslator, Translator};
use crate::pipeline::{images, postprocess, segment};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// OCR a PDF file or URL and translate it.
///
/// # Arguments
/// * `input` — Local file path or HTTP/HTTPS URL to a PDF
/// * `config` — Run configuration
///
/// # Returns
/// `Ok(TranslationOutput)` on success, even if some chunks kept their
/// original text (check `output.stats.failed_chunks`).
///
/// # Errors
/// Returns `Err(TranslateError)` only for fatal errors:
/// - File not found / permission denied / not a PDF
/// - Missing OCR credential or OCR request failure
/// - No LLM provider configured
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let input_str = input_str.as_ref();
    info!("Starting translation run: {}", input_str);

    let source = input::resolve_input(input_str)?;
    let ocr = MistralOcr::from_config(config)?;
    let (translator, counter) = resolve_translation(config)?;

    convert_with(&source, &ocr, translator, counter, config).await
}

/// Run the whole pipeline with caller-supplied collaborators.
///
/// This is what [`convert`] calls once it has built the Mistral client, the
/// LLM translator and the tokenizer; tests inject fakes here.
pub async fn convert_with(
    source: &DocumentSource,
    ocr: &dyn OcrService,
    translator: Arc<dyn Translator>,
    counter: Arc<dyn TokenCounter>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let total_start = Instant::now();

    // ── Step 1: OCR ──────────────────────────────────────────────────────
    let ocr_start = Instant::now();
    let pages = ocr.recognise(source).await?;
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    // ── Step 2: Assemble pages ───────────────────────────────────────────
    let raw_markdown = assemble_pages(&pages, &config.pages, &config.page_separator);
    let selected_pages = config.pages.to_indices(pages.len()).len();
    info!(
        "OCR produced {} pages ({} selected) in {}ms",
        pages.len(),
        selected_pages,
        ocr_duration_ms
    );

    // ── Step 3: Translate ────────────────────────────────────────────────
    let mut output = translate_with(raw_markdown, translator, counter, config).await;
    output.stats.total_pages = pages.len();
    output.stats.selected_pages = selected_pages;
    output.stats.ocr_duration_ms = ocr_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Run complete: {}/{} chunks translated, {}ms total",
        output.stats.translated_chunks, output.stats.total_chunks, output.stats.total_duration_ms
    );
    Ok(output)
}

/// Translate an existing Markdown document, skipping OCR.
pub async fn translate_markdown(
    markdown: impl Into<String>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let (translator, counter) = resolve_translation(config)?;
    Ok(translate_with(markdown.into(), translator, counter, config).await)
}

/// Image extraction, segmentation, chunked translation and reassembly.
///
/// Never fails: chunk errors are recorded in the returned chunk results.
pub async fn translate_with(
    raw_markdown: String,
    translator: Arc<dyn Translator>,
    counter: Arc<dyn TokenCounter>,
    config: &TranslationConfig,
) -> TranslationOutput {
    let start = Instant::now();

    let (extracted, placeholders) = images::extract(&raw_markdown);
    let doc = segment::segment(&extracted);
    debug!(
        "Segmented: title={}, body {} bytes, references={}, trailing {} bytes",
        doc.title.is_some(),
        doc.body.len(),
        doc.reference_block.is_some(),
        doc.trailing_body.len()
    );

    let chunker = Chunker::new(counter, config.token_budget);
    let translated = translate_document(&doc, &placeholders, &chunker, translator, config).await;

    let mut stats = TranslationStats {
        images: placeholders.len(),
        lost_images: translated.lost_images,
        translation_duration_ms: start.elapsed().as_millis() as u64,
        ..Default::default()
    };
    stats.record_chunks(&translated.chunks);
    stats.total_duration_ms = stats.translation_duration_ms;

    TranslationOutput {
        raw_markdown,
        markdown: postprocess::finish_document(&translated.markdown),
        chunks: translated.chunks,
        stats,
    }
}

/// OCR and translate a PDF, writing the raw and translated Markdown to disk.
///
/// Both files are written atomically (temp file + rename) and replace any
/// existing file.
pub async fn convert_to_files(
    input_str: impl AsRef<str>,
    raw_path: impl AsRef<Path>,
    translated_path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let output = convert(input_str, config).await?;
    write_atomic(raw_path.as_ref(), &output.raw_markdown).await?;
    write_atomic(translated_path.as_ref(), &output.markdown).await?;
    Ok(output)
}

/// Translate a Markdown file and write the result to `output_path`.
pub async fn translate_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let input_path = input_path.as_ref();
    let markdown = read_markdown(input_path).await?;
    let output = translate_markdown(markdown, config).await?;
    write_atomic(output_path.as_ref(), &output.markdown).await?;
    Ok(output)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TranslateError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Read a Markdown input file.
pub async fn read_markdown(path: &Path) -> Result<String, TranslateError> {
    tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => TranslateError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => TranslateError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => TranslateError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

/// Write `contents` to `path` via a sibling temp file and rename.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), TranslateError> {
    let write_failed = |e| TranslateError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_failed)?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// The translator and its tokenizer, both bound to the same model.
pub(crate) fn resolve_translation(
    config: &TranslationConfig,
) -> Result<(Arc<dyn Translator>, Arc<dyn TokenCounter>), TranslateError> {
    let model = resolve_model(config);
    let provider = resolve_provider(config)?;
    let counter: Arc<dyn TokenCounter> = Arc::new(TiktokenCounter::for_model(&model)?);
    debug!("Translating with model {}", model);
    let translator: Arc<dyn Translator> = Arc::new(LlmTranslator::new(provider, model, config));
    Ok((translator, counter))
}

/// Model the provider from [`resolve_provider`] runs, in the same order of
/// precedence.
pub(crate) fn resolve_model(config: &TranslationConfig) -> String {
    if config.provider.is_none() && config.provider_name.is_none() {
        if let Some((_, model)) = env_provider_pair() {
            return model;
        }
    }
    config.model_name().to_string()
}

/// `EDGEQUAKE_LLM_PROVIDER` and `EDGEQUAKE_MODEL`, when both are non-empty.
fn env_provider_pair() -> Option<(String, String)> {
    let provider = std::env::var("EDGEQUAKE_LLM_PROVIDER")
        .ok()
        .filter(|p| !p.is_empty())?;
    let model = std::env::var("EDGEQUAKE_MODEL")
        .ok()
        .filter(|m| !m.is_empty())?;
    Some((provider, model))
}

/// Instantiate a named provider with the given model.
fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, TranslateError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        TranslateError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key (`OPENAI_API_KEY`, …) from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    honoured only when both are set.
/// 4. **OpenAI** when `OPENAI_API_KEY` is present.
/// 5. **Full auto-detection** via [`ProviderFactory::from_env`].
pub(crate) fn resolve_provider(
    config: &TranslationConfig,
) -> Result<Arc<dyn LLMProvider>, TranslateError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, config.model_name());
    }

    if let Some((prov, model)) = env_provider_pair() {
        return create_provider(&prov, &model);
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", config.model_name());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| TranslateError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
