//! Token counting in the translation model's units.
//!
//! The chunker measures many overlapping candidate strings, so counting must
//! be deterministic: the same text always yields the same count.

use crate::error::TranslateError;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Measures text size in translation-model tokens.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// BPE token counter backed by tiktoken.
#[derive(Clone)]
pub struct TiktokenCounter {
    bpe: Arc<CoreBPE>,
}

impl TiktokenCounter {
    /// Tokenizer for an OpenAI model name; models tiktoken does not know
    /// (Anthropic, Gemini, local models) fall back to `o200k_base`.
    pub fn for_model(model: &str) -> Result<Self, TranslateError> {
        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(_) => {
                debug!("No tiktoken encoding for '{}', using o200k_base", model);
                tiktoken_rs::o200k_base()
                    .map_err(|e| TranslateError::Internal(format!("tokenizer: {e}")))?
            }
        };
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl std::fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TiktokenCounter")
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}
