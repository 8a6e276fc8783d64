//! # usersim Core
//!
//! Domain types, traits, and error definitions for the usersim agent
//! harness. This crate has **zero framework dependencies** — it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (completion service, dataset) is defined
//! as a trait here. Implementations live in their respective crates.
//! This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod llm;
pub mod message;
pub mod store;
pub mod task;

// Re-export key types at crate root for ergonomics
pub use error::{DataError, Error, LlmError, ParseError, PlanError, Result, TaskError};
pub use llm::{ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, LlmClient, Usage};
pub use message::{Message, Role};
pub use store::InteractionStore;
pub use task::{REVIEW_MAX_CHARS, ReviewRecord, STAR_LEVELS, Task, TaskKind, TaskOutput};
