//! Dataset and task-supplier implementations.
//!
//! The agent workflow sees only the `InteractionStore` trait from
//! `usersim-core`; this crate provides the file-backed implementation
//! plus the task/groundtruth loaders the CLI driver uses.

pub mod store;
pub mod tasks;

pub use store::JsonInteractionStore;
pub use tasks::{TaskSet, load_groundtruth, pair_key};
