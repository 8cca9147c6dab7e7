//! Configuration types for PDF-to-translated-Markdown runs.
//!
//! All run behaviour is controlled through [`TranslationConfig`], built via
//! its [`TranslationConfigBuilder`]. Every knob lives in one cloneable struct
//! so it can be shared with concurrently running chunk tasks and logged as a
//! whole.

use crate::error::TranslateError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default chunk token budget, measured with the translation model's tokenizer.
pub const DEFAULT_TOKEN_BUDGET: usize = 8000;

/// Default translation model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default Mistral OCR model.
pub const DEFAULT_OCR_MODEL: &str = "mistral-ocr-latest";

/// Default Mistral API base URL.
pub const DEFAULT_OCR_BASE_URL: &str = "https://api.mistral.ai/v1";

/// Configuration for one OCR + translation run.
///
/// Built via [`TranslationConfig::builder()`] or using
/// [`TranslationConfig::default()`].
///
/// # Example
/// ```rust
/// use paperglance::TranslationConfig;
///
/// let config = TranslationConfig::builder()
///     .token_budget(4000)
///     .target_language("German")
///     .max_retries(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.token_budget, 4000);
/// ```
#[derive(Clone)]
pub struct TranslationConfig {
    /// Maximum tokens per translation chunk. Default: 8000.
    ///
    /// A chunk only exceeds this when a single sentence is longer than the
    /// budget; sentences are never split.
    pub token_budget: usize,

    /// Language of the scanned document. Default: "English".
    pub source_language: String,

    /// Language to translate into. Default: "Japanese".
    pub target_language: String,

    /// LLM model identifier used for translation and token counting.
    /// If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for translation. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per chunk. Default: 16384.
    ///
    /// Must comfortably exceed `token_budget`: translated text is often longer
    /// than its source (English → Japanese roughly 1.2–1.5× in tokens).
    pub max_tokens: usize,

    /// Retry attempts after a failed translate call. Default: 0 (one attempt).
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout for a translate request, in seconds. Default: None.
    pub chunk_timeout_secs: Option<u64>,

    /// Number of chunks translated at once. Default: 1 (strictly sequential).
    ///
    /// Results are always reassembled in chunk order regardless of which
    /// request finishes first.
    pub concurrency: usize,

    /// Custom translation instruction. If None, built from the language pair.
    pub system_prompt: Option<String>,

    /// Page selection applied to OCR output. Default: all pages.
    pub pages: PageSelection,

    /// Separator between pages in the combined document. Default: blank line.
    pub page_separator: PageSeparator,

    /// Mistral OCR model. Default: "mistral-ocr-latest".
    pub ocr_model: String,

    /// Mistral API key. If None, read from `MISTRALAI_API_KEY` / `MISTRAL_API_KEY`.
    pub ocr_api_key: Option<String>,

    /// Mistral API base URL. Default: "https://api.mistral.ai/v1".
    pub ocr_base_url: String,

    /// Ask the OCR service for base64 image payloads. Default: true.
    pub include_images: bool,

    /// Timeout for each OCR HTTP request, in seconds. Default: 300.
    pub ocr_timeout_secs: u64,

    /// Optional per-chunk progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            token_budget: DEFAULT_TOKEN_BUDGET,
            source_language: "English".to_string(),
            target_language: "Japanese".to_string(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 16384,
            max_retries: 0,
            retry_backoff_ms: 500,
            chunk_timeout_secs: None,
            concurrency: 1,
            system_prompt: None,
            pages: PageSelection::default(),
            page_separator: PageSeparator::default(),
            ocr_model: DEFAULT_OCR_MODEL.to_string(),
            ocr_api_key: None,
            ocr_base_url: DEFAULT_OCR_BASE_URL.to_string(),
            include_images: true,
            ocr_timeout_secs: 300,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("token_budget", &self.token_budget)
            .field("source_language", &self.source_language)
            .field("target_language", &self.target_language)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("chunk_timeout_secs", &self.chunk_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("pages", &self.pages)
            .field("page_separator", &self.page_separator)
            .field("ocr_model", &self.ocr_model)
            .field("ocr_api_key", &self.ocr_api_key.as_ref().map(|_| "<redacted>"))
            .field("include_images", &self.include_images)
            .finish()
    }
}

impl TranslationConfig {
    /// Create a new builder for `TranslationConfig`.
    pub fn builder() -> TranslationConfigBuilder {
        TranslationConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model used for translation and tokenisation.
    pub fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`TranslationConfig`].
pub struct TranslationConfigBuilder {
    config: TranslationConfig,
}

impl fmt::Debug for TranslationConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl TranslationConfigBuilder {
    pub fn token_budget(mut self, tokens: usize) -> Self {
        self.config.token_budget = tokens;
        self
    }

    pub fn source_language(mut self, lang: impl Into<String>) -> Self {
        self.config.source_language = lang.into();
        self
    }

    pub fn target_language(mut self, lang: impl Into<String>) -> Self {
        self.config.target_language = lang.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn chunk_timeout_secs(mut self, secs: u64) -> Self {
        self.config.chunk_timeout_secs = Some(secs);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr_model = model.into();
        self
    }

    pub fn ocr_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.ocr_api_key = Some(key.into());
        self
    }

    pub fn ocr_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.ocr_base_url = url.into();
        self
    }

    pub fn include_images(mut self, v: bool) -> Self {
        self.config.include_images = v;
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranslationConfig, TranslateError> {
        let c = &self.config;
        if c.token_budget == 0 {
            return Err(TranslateError::InvalidConfig(
                "Token budget must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(TranslateError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.target_language.trim().is_empty() {
            return Err(TranslateError::InvalidConfig(
                "Target language must not be empty".into(),
            ));
        }
        if c.max_tokens < c.token_budget {
            tracing::warn!(
                "max_tokens ({}) is below the chunk budget ({}); translations may be truncated",
                c.max_tokens,
                c.token_budget
            );
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which OCR pages go into the combined document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Keep all pages (default).
    #[default]
    All,
    /// Keep a single page (1-indexed).
    Single(usize),
    /// Keep a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Keep specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// How to separate pages in the combined Markdown document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// Blank line: "\n\n". (default)
    #[default]
    None,
    /// Horizontal rule: "\n\n---\n\n"
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator placed before the given page number (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behaviour() {
        let c = TranslationConfig::default();
        assert_eq!(c.token_budget, 8000);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.max_retries, 0);
        assert!(c.chunk_timeout_secs.is_none());
        assert_eq!(c.model_name(), "gpt-4o-mini");
        assert_eq!(c.ocr_model, "mistral-ocr-latest");
    }

    #[test]
    fn zero_budget_rejected() {
        let err = TranslationConfig::builder().token_budget(0).build().unwrap_err();
        assert!(err.to_string().contains("Token budget"));
    }

    #[test]
    fn empty_target_language_rejected() {
        assert!(TranslationConfig::builder()
            .target_language("  ")
            .build()
            .is_err());
    }

    #[test]
    fn concurrency_clamped_to_one() {
        let c = TranslationConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = TranslationConfig::builder()
            .ocr_api_key("secret-key")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(2).to_indices(3), vec![1]);
        assert_eq!(PageSelection::Single(9).to_indices(3), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 10).to_indices(3), vec![1, 2]);
        assert_eq!(PageSelection::Set(vec![3, 1, 3]).to_indices(5), vec![0, 2]);
    }

    #[test]
    fn separator_rendering() {
        assert_eq!(PageSeparator::None.render(2), "\n\n");
        assert_eq!(PageSeparator::HorizontalRule.render(2), "\n\n---\n\n");
        assert_eq!(PageSeparator::Comment.render(4), "\n\n<!-- page 4 -->\n\n");
        assert_eq!(
            PageSeparator::Custom("***".into()).render(1),
            "\n\n***\n\n"
        );
    }
}
