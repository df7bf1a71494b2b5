//! Sub-word token counting.
//!
//! Counts are reported next to each provider's raw output to compare how
//! much context each one would consume. The default vocabulary is the
//! `o200k_base` BPE used by current OpenAI models.

use crate::error::{BenchError, Result};
use tiktoken_rs::CoreBPE;

/// Name of the default vocabulary, recorded for reproducibility.
pub const DEFAULT_ENCODING: &str = "o200k_base";

enum Backend {
    Bpe(CoreBPE),
    #[cfg(feature = "hf-tokenizer")]
    HuggingFace(Box<tokenizers::Tokenizer>),
}

/// Deterministic token counter over a fixed vocabulary.
pub struct TokenCounter {
    backend: Backend,
    encoding: String,
}

impl TokenCounter {
    /// Counter using the `o200k_base` vocabulary.
    pub fn o200k() -> Result<Self> {
        let bpe = tiktoken_rs::o200k_base().map_err(|e| BenchError::Tokenizer(e.to_string()))?;
        Ok(Self {
            backend: Backend::Bpe(bpe),
            encoding: DEFAULT_ENCODING.to_string(),
        })
    }

    /// Counter using a Hugging Face `tokenizer.json` file.
    #[cfg(feature = "hf-tokenizer")]
    pub fn from_tokenizer_file(path: &std::path::Path) -> Result<Self> {
        let tokenizer = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| BenchError::Tokenizer(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            backend: Backend::HuggingFace(Box::new(tokenizer)),
            encoding: path.display().to_string(),
        })
    }

    /// Vocabulary identifier.
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Number of tokens in `text`. Special-token markup counts as plain text.
    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        match &self.backend {
            Backend::Bpe(bpe) => bpe.encode_ordinary(text).len(),
            #[cfg(feature = "hf-tokenizer")]
            Backend::HuggingFace(tokenizer) => match tokenizer.encode(text, false) {
                Ok(encoding) => encoding.len(),
                Err(e) => {
                    tracing::warn!(error = %e, "tokenizer failed, counting 0 tokens");
                    0
                }
            },
        }
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("encoding", &self.encoding)
            .finish()
    }
}
