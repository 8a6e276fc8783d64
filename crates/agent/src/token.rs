//! Token counting and truncation.
//!
//! Context fragments are budgeted in encoded tokens, not characters, so
//! truncation can never split multi-byte text mid-token. The real codec
//! wraps a HuggingFace `tokenizer.json`; the heuristic codec estimates
//! ~4 characters per token for setups without a tokenizer file.

use std::path::Path;
use tokenizers::Tokenizer;
use usersim_core::{Error, Result};

/// Counts and truncates text against a token budget.
///
/// Both operations are deterministic and stable under repeated calls.
pub trait TokenCodec: Send + Sync {
    /// Number of encoded tokens in `text`.
    fn count(&self, text: &str) -> Result<usize>;

    /// The prefix of `text` whose encoded length is at most `max_tokens`
    /// tokens, decoded back to text. Returns `text` unchanged when it is
    /// already within budget.
    fn truncate(&self, text: &str, max_tokens: usize) -> Result<String>;
}

/// A codec backed by a HuggingFace tokenizer file.
#[derive(Debug)]
pub struct HfTokenCodec {
    tokenizer: Tokenizer,
}

impl HfTokenCodec {
    /// Load the tokenizer from a `tokenizer.json` file.
    ///
    /// An unavailable encoding is a fatal configuration error — callers
    /// cannot recover from it per-task.
    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| Error::Config {
            message: format!("Failed to load tokenizer from {}: {e}", path.display()),
        })?;
        Ok(Self { tokenizer })
    }

    fn encode_ids(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| Error::Internal(format!("Token encoding failed: {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }
}

impl TokenCodec for HfTokenCodec {
    fn count(&self, text: &str) -> Result<usize> {
        Ok(self.encode_ids(text)?.len())
    }

    fn truncate(&self, text: &str, max_tokens: usize) -> Result<String> {
        let ids = self.encode_ids(text)?;
        if ids.len() <= max_tokens {
            return Ok(text.to_string());
        }
        self.tokenizer
            .decode(&ids[..max_tokens], true)
            .map_err(|e| Error::Internal(format!("Token decoding failed: {e}")))
    }
}

/// A character-based estimate: 1 token ≈ 4 bytes, rounding up.
///
/// Accurate within ~10% for BPE tokenizers on English text. Truncation
/// respects char boundaries so multi-byte text is never split.
pub struct HeuristicCodec;

impl TokenCodec for HeuristicCodec {
    fn count(&self, text: &str) -> Result<usize> {
        Ok(text.len().div_ceil(4))
    }

    fn truncate(&self, text: &str, max_tokens: usize) -> Result<String> {
        let max_bytes = max_tokens.saturating_mul(4);
        if text.len() <= max_bytes {
            return Ok(text.to_string());
        }
        let mut end = 0;
        for (idx, ch) in text.char_indices() {
            if idx + ch.len_utf8() > max_bytes {
                break;
            }
            end = idx + ch.len_utf8();
        }
        Ok(text[..end].to_string())
    }
}
