//! LlmClient trait — the abstraction over completion-service backends.
//!
//! An LlmClient knows how to send an ordered list of role-tagged messages
//! to a completion endpoint and get generated text back. This is the
//! single point of contact with the provider: every other component is
//! independent of which backend is configured.
//!
//! Implementations: OpenAI-compatible endpoints, test mocks.

use crate::error::LlmError;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to use (e.g., "gpt-4o", "qwen2.5-72b-instruct")
    pub model: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic)
    #[serde(default)]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Stop sequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,

    /// Number of completions to sample
    #[serde(default = "default_n")]
    pub n: u8,
}

fn default_n() -> u8 {
    1
}

impl ChatRequest {
    /// A single-sample request for one user prompt — the common case.
    pub fn single(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::user(prompt)],
            temperature: 0.0,
            max_tokens: None,
            stop: Vec::new(),
            n: 1,
        }
    }
}

/// A complete response from the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated texts, one per requested sample (`n = 1` → one entry).
    pub texts: Vec<String>,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// The first (usually only) generated text.
    pub fn text(&self) -> &str {
        self.texts.first().map(String::as_str).unwrap_or_default()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// An embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The model to use for embeddings.
    pub model: String,

    /// The texts to embed.
    pub inputs: Vec<String>,
}

/// An embedding response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The embedding vectors, one per input text.
    pub embeddings: Vec<Vec<f32>>,

    /// Which model was used.
    pub model: String,

    /// Token usage.
    pub usage: Option<Usage>,
}

/// The core LlmClient trait.
///
/// The agent workflow calls `chat()` without knowing which provider is
/// behind it. Retry/backoff policy deliberately does not live here or in
/// any caller inside the workflow — a harness running many tasks owns it.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// A human-readable name for this client (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a request and get the generated text(s).
    async fn chat(&self, request: ChatRequest) -> std::result::Result<ChatResponse, LlmError>;

    /// Generate embeddings for the given texts.
    ///
    /// Issued by the same provider abstraction; the core workflow itself
    /// never calls this. Default implementation reports unsupported.
    async fn embed(
        &self,
        _request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, LlmError> {
        Err(LlmError::NotConfigured(format!(
            "Client '{}' does not support embeddings",
            self.name()
        )))
    }

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, LlmError> {
        Ok(true)
    }
}
