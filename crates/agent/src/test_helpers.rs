//! Shared test helpers for agent tests.

use crate::planner::{SubTask, SubTaskKind};
use crate::token::TokenCodec;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Mutex;
use usersim_core::error::{DataError, LlmError};
use usersim_core::llm::{ChatRequest, ChatResponse};
use usersim_core::{InteractionStore, LlmClient, Result};

/// A mock client that returns a sequence of scripted completions.
///
/// Each call to `chat` returns the next text in the queue. Panics if
/// more calls are made than texts provided.
pub struct SequentialMockClient {
    texts: Mutex<Vec<String>>,
    call_count: Mutex<usize>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl SequentialMockClient {
    pub fn new(texts: Vec<String>) -> Self {
        Self {
            texts: Mutex::new(texts),
            call_count: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A client that returns a single scripted completion.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![text.to_string()])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// The requests received so far, for prompt assertions.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for SequentialMockClient {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn chat(&self, request: ChatRequest) -> std::result::Result<ChatResponse, LlmError> {
        let mut count = self.call_count.lock().unwrap();
        let texts = self.texts.lock().unwrap();

        if *count >= texts.len() {
            panic!(
                "SequentialMockClient: no more responses (call #{}, have {})",
                *count,
                texts.len()
            );
        }

        let text = texts[*count].clone();
        *count += 1;
        self.requests.lock().unwrap().push(request);

        Ok(ChatResponse {
            texts: vec![text],
            model: "mock-model".into(),
            usage: None,
        })
    }
}

/// An in-memory store that serves synthetic records and logs every call.
#[derive(Default)]
pub struct MockStore {
    calls: Mutex<Vec<String>>,
    user_overrides: Mutex<Vec<(String, serde_json::Value)>>,
    missing_items: HashSet<String>,
}

impl MockStore {
    /// Override the record returned for one user id.
    pub fn with_user(self, user_id: &str, record: serde_json::Value) -> Self {
        self.user_overrides
            .lock()
            .unwrap()
            .push((user_id.to_string(), record));
        self
    }

    /// Make an item id report not-found.
    pub fn without_item(mut self, item_id: &str) -> Self {
        self.missing_items.insert(item_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl InteractionStore for MockStore {
    async fn get_user(&self, user_id: &str) -> std::result::Result<serde_json::Value, DataError> {
        self.log(format!("user:{user_id}"));
        let overrides = self.user_overrides.lock().unwrap();
        if let Some((_, record)) = overrides.iter().find(|(id, _)| id == user_id) {
            return Ok(record.clone());
        }
        Ok(json!({"user_id": user_id, "profile": "mock user"}))
    }

    async fn get_item(&self, item_id: &str) -> std::result::Result<serde_json::Value, DataError> {
        self.log(format!("item:{item_id}"));
        if self.missing_items.contains(item_id) {
            return Err(DataError::ItemNotFound(item_id.to_string()));
        }
        Ok(json!({"item_id": item_id, "title": "mock item"}))
    }

    async fn get_reviews(
        &self,
        user_id: &str,
    ) -> std::result::Result<Vec<serde_json::Value>, DataError> {
        self.log(format!("reviews:{user_id}"));
        Ok(vec![json!({"user_id": user_id, "stars": 4.0, "text": "solid"})])
    }
}

/// A codec where one whitespace-separated word is one token.
pub struct WordCodec;

impl TokenCodec for WordCodec {
    fn count(&self, text: &str) -> Result<usize> {
        Ok(text.split_whitespace().count())
    }

    fn truncate(&self, text: &str, max_tokens: usize) -> Result<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= max_tokens {
            return Ok(text.to_string());
        }
        Ok(words[..max_tokens].join(" "))
    }
}

/// A sub-task of the given kind with placeholder text.
pub fn sub_task(kind: SubTaskKind) -> SubTask {
    SubTask {
        description: format!("{kind:?}"),
        reasoning_instruction: "None".into(),
        tool_instruction: None,
        kind,
    }
}
