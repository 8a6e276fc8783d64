//! The usersim agent — the core task-resolution workflow.
//!
//! One task resolution walks a fixed **Plan → Gather → Reason → Parse**
//! sequence:
//!
//! 1. **Plan** — one completion call decomposes the task into ordered,
//!    tagged sub-tasks
//! 2. **Gather** — each sub-task pulls records from the dataset and
//!    truncates them against the token budget
//! 3. **Reason** — exactly one completion call over the assembled prompt
//! 4. **Parse** — the raw completion becomes the task's structured
//!    result, with a defined fallback per result shape

pub mod context;
pub mod parser;
pub mod planner;
pub mod reasoner;
pub mod token;
pub mod workflow;

pub use context::{ContextBundle, ContextGatherer, DEFAULT_CONTEXT_BUDGET, Fragment, FragmentStats};
pub use parser::{RankingParse, parse_ranking, parse_review};
pub use planner::{Planner, SubTask, SubTaskKind};
pub use reasoner::Reasoner;
pub use token::{HeuristicCodec, HfTokenCodec, TokenCodec};
pub use workflow::{AgentWorkflow, Resolution};

#[cfg(test)]
pub(crate) mod test_helpers;
