//! Completion-service client implementations.
//!
//! One concrete client ships today: [`OpenAiCompatClient`], which covers
//! every provider exposing an OpenAI-compatible endpoint. The agent
//! workflow only ever sees the `LlmClient` trait from `usersim-core`.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatClient;
