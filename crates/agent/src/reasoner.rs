//! Reasoner — single-shot reasoning over assembled context.
//!
//! Exactly one completion request per invocation; there is no retry loop
//! at this layer. Sampling parameters are fixed per task kind at
//! construction, not negotiated per call.

use std::sync::Arc;
use tracing::debug;
use usersim_core::{ChatRequest, LlmClient, Message, Result, TaskKind};

/// The reasoning module for one task kind.
pub struct Reasoner {
    llm: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    /// Append a step-by-step coda to the prompt (ranking style).
    step_by_step: bool,
}

const REASON_MAX_TOKENS: u32 = 1000;

impl Reasoner {
    /// Construct a reasoner with the sampling parameters of `kind`.
    pub fn for_kind(llm: Arc<dyn LlmClient>, model: impl Into<String>, kind: TaskKind) -> Self {
        let (temperature, step_by_step) = match kind {
            TaskKind::Ranking => (0.1, true),
            TaskKind::Review => (0.0, false),
        };
        Self {
            llm,
            model: model.into(),
            temperature,
            max_tokens: REASON_MAX_TOKENS,
            step_by_step,
        }
    }

    /// Issue one completion request over the prompt and return the raw
    /// model text. Provider failures surface to the caller untouched.
    pub async fn reason(&self, prompt: &str) -> Result<String> {
        let content = if self.step_by_step {
            format!("{prompt}\nLet's think step by step.\n")
        } else {
            prompt.to_string()
        };

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::user(content)],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            stop: Vec::new(),
            n: 1,
        };

        let response = self.llm.chat(request).await.map_err(usersim_core::Error::Llm)?;
        debug!(model = %self.model, temperature = self.temperature, "Reasoning completed");
        Ok(response.text().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::SequentialMockClient;

    #[tokio::test]
    async fn one_request_per_invocation() {
        let llm = Arc::new(SequentialMockClient::single_text("the answer"));
        let reasoner = Reasoner::for_kind(llm.clone(), "mock-model", TaskKind::Review);

        let out = reasoner.reason("what would you rate this?").await.unwrap();
        assert_eq!(out, "the answer");
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn ranking_prompt_gets_step_by_step_coda() {
        let llm = Arc::new(SequentialMockClient::single_text("['a']"));
        let reasoner = Reasoner::for_kind(llm.clone(), "mock-model", TaskKind::Ranking);

        reasoner.reason("rank these").await.unwrap();

        let requests = llm.requests();
        let content = &requests[0].messages[0].content;
        assert!(content.contains("Let's think step by step."));
        assert!((requests[0].temperature - 0.1).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn review_prompt_is_sent_verbatim() {
        let llm = Arc::new(SequentialMockClient::single_text("stars: 4.0"));
        let reasoner = Reasoner::for_kind(llm.clone(), "mock-model", TaskKind::Review);

        reasoner.reason("write a review").await.unwrap();

        let requests = llm.requests();
        assert_eq!(requests[0].messages[0].content, "write a review");
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].n, 1);
    }
}
