//! Task and result domain types.
//!
//! A task is an opaque record handed over by the surrounding harness.
//! The workflow reads only the fields its sub-tasks need, by name — there
//! is no fixed schema beyond the accessors below. A task is immutable for
//! the duration of one resolution.

use crate::error::TaskError;
use serde::{Deserialize, Serialize};

/// Which kind of resolution a task asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Order a candidate list by predicted user preference.
    Ranking,
    /// Write a rating + engagement + review text as the user.
    Review,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Ranking => write!(f, "ranking"),
            TaskKind::Review => write!(f, "review"),
        }
    }
}

/// One task record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Identifier of this task within its task set.
    pub id: String,

    /// Which resolution kind this task drives.
    pub kind: TaskKind,

    /// The raw task fields, consumed by name.
    pub fields: serde_json::Value,
}

impl Task {
    pub fn new(id: impl Into<String>, kind: TaskKind, fields: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            kind,
            fields,
        }
    }

    /// The subject user this task is about.
    pub fn user_id(&self) -> Result<&str, TaskError> {
        self.fields
            .get("user_id")
            .and_then(|v| v.as_str())
            .ok_or(TaskError::MissingField("user_id"))
    }

    /// The ordered candidate item ids of a ranking task.
    pub fn candidate_list(&self) -> Result<Vec<String>, TaskError> {
        let arr = self
            .fields
            .get("candidate_list")
            .ok_or(TaskError::MissingField("candidate_list"))?
            .as_array()
            .ok_or(TaskError::BadField("candidate_list"))?;
        arr.iter()
            .map(|v| {
                v.as_str()
                    .map(String::from)
                    .ok_or(TaskError::BadField("candidate_list"))
            })
            .collect()
    }

    /// The target item of a review task. Accepts `item_id` or the
    /// review-platform spelling `business_id`.
    pub fn item_id(&self) -> Result<&str, TaskError> {
        self.fields
            .get("item_id")
            .or_else(|| self.fields.get("business_id"))
            .and_then(|v| v.as_str())
            .ok_or(TaskError::MissingField("item_id"))
    }
}

/// The allowed discrete star ratings.
pub const STAR_LEVELS: [f32; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];

/// Maximum review text length, in characters.
pub const REVIEW_MAX_CHARS: usize = 512;

/// A parsed review-task result: rating, engagement counts, review text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// One of [`STAR_LEVELS`].
    pub stars: f32,
    pub useful: u32,
    pub funny: u32,
    pub cool: u32,
    /// At most [`REVIEW_MAX_CHARS`] characters.
    pub review: String,
}

/// The structured result of one task resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskOutput {
    /// Candidate ids in predicted preference order.
    Ranking {
        items: Vec<String>,
        /// True when the model output had no parsable list and the
        /// original candidate order was returned as the safe default.
        recovered: bool,
    },
    /// The five labeled review fields.
    Review(ReviewRecord),
}
