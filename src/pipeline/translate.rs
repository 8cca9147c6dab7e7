//! Translate-call wrapper: send one chunk to the LLM and classify the result.
//!
//! The [`Translator`] trait is the seam between the orchestrator and the
//! outside world. Production code uses [`LlmTranslator`] over an
//! `edgequake_llm` provider; tests plug in deterministic fakes.
//!
//! ## Retry Strategy
//!
//! Rate limits (HTTP 429/503) are the common failure under load. When
//! `max_retries > 0` each failed attempt waits `retry_backoff_ms * 2^(n-1)`
//! before trying again. With the default of 0 retries a chunk gets exactly
//! one attempt, and a failure keeps the chunk's original text in the output.

use crate::config::TranslationConfig;
use crate::error::{ChunkError, TranslateError};
use crate::pipeline::chunk::PlannedChunk;
use crate::pipeline::postprocess;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// A successful translate call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl Completion {
    /// A completion carrying only text, with no usage figures.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Translates one chunk of Markdown under a system instruction.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, instruction: &str, chunk: &str) -> Result<Completion, TranslateError>;
}

/// [`Translator`] backed by an `edgequake_llm` chat provider.
pub struct LlmTranslator {
    provider: Arc<dyn LLMProvider>,
    model: String,
    options: CompletionOptions,
}

impl LlmTranslator {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        config: &TranslationConfig,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            options: build_options(config),
        }
    }

    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }
}

impl std::fmt::Debug for LlmTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmTranslator")
            .field("provider", &"<dyn LLMProvider>")
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate(&self, instruction: &str, chunk: &str) -> Result<Completion, TranslateError> {
        let messages = vec![ChatMessage::system(instruction), ChatMessage::user(chunk)];
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| TranslateError::LlmApiError {
                message: e.to_string(),
            })?;
        Ok(Completion {
            text: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

/// Build `CompletionOptions` from the translation config.
fn build_options(config: &TranslationConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// How a single chunk resolved.
///
/// A failed chunk still contributes text to the document: its original
/// source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChunkOutcome {
    Translated {
        text: String,
        input_tokens: usize,
        output_tokens: usize,
    },
    Failed {
        original: String,
        cause: ChunkError,
    },
}

impl ChunkOutcome {
    /// The text that goes into the reassembled document.
    pub fn text(&self) -> &str {
        match self {
            ChunkOutcome::Translated { text, .. } => text,
            ChunkOutcome::Failed { original, .. } => original,
        }
    }

    pub fn is_translated(&self) -> bool {
        matches!(self, ChunkOutcome::Translated { .. })
    }

    pub fn error(&self) -> Option<&ChunkError> {
        match self {
            ChunkOutcome::Translated { .. } => None,
            ChunkOutcome::Failed { cause, .. } => Some(cause),
        }
    }
}

/// Translate one planned chunk, retrying per config.
///
/// Never returns an error: when every attempt fails the outcome is
/// [`ChunkOutcome::Failed`] carrying the chunk's original text. The second
/// element is the number of retries spent.
pub async fn translate_chunk(
    translator: &dyn Translator,
    instruction: &str,
    chunk: &PlannedChunk,
    config: &TranslationConfig,
) -> (ChunkOutcome, u32) {
    let number = chunk.index + 1;
    let mut last_err: Option<ChunkError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "Chunk {}: retry {}/{} after {}ms",
                number, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let call = translator.translate(instruction, &chunk.text);
        let result = match config.chunk_timeout_secs {
            Some(secs) => match timeout(Duration::from_secs(secs), call).await {
                Ok(r) => r.map_err(|e| failed(number, attempt + 1, e)),
                Err(_) => Err(ChunkError::Timeout { chunk: number, secs }),
            },
            None => call.await.map_err(|e| failed(number, attempt + 1, e)),
        };

        match result {
            Ok(completion) => {
                debug!(
                    "Chunk {}: {} source tokens, {} in / {} out",
                    number, chunk.tokens, completion.input_tokens, completion.output_tokens
                );
                let outcome = ChunkOutcome::Translated {
                    text: postprocess::clean_translation(&completion.text),
                    input_tokens: completion.input_tokens,
                    output_tokens: completion.output_tokens,
                };
                return (outcome, attempt);
            }
            Err(e) => {
                warn!("Chunk {}: attempt {} failed: {}", number, attempt + 1, e);
                last_err = Some(e);
            }
        }
    }

    let cause = last_err.unwrap_or_else(|| ChunkError::TranslationFailed {
        chunk: number,
        attempts: config.max_retries + 1,
        detail: "Unknown error".to_string(),
    });
    warn!("Chunk {}: keeping original text", number);

    (
        ChunkOutcome::Failed {
            original: chunk.text.clone(),
            cause,
        },
        config.max_retries,
    )
}

fn failed(chunk: usize, attempts: u32, err: TranslateError) -> ChunkError {
    ChunkError::TranslationFailed {
        chunk,
        attempts,
        detail: err.to_string(),
    }
}
