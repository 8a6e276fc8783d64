//! Planner — decomposes a task into an ordered plan of sub-tasks.
//!
//! The planner issues one completion call with a few-shot prompt and
//! parses the model's free text back into [`SubTask`] records. Each
//! record carries a [`SubTaskKind`] tag, assigned here and only here:
//! downstream components dispatch on the tag, never on description
//! keywords. When prior feedback is supplied the prompt switches to a
//! reflexion-augmented variant, enabling iterative re-planning.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use usersim_core::error::PlanError;
use usersim_core::{ChatRequest, LlmClient, Message, Result, TaskKind};

/// What a sub-task asks the context gatherer to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubTaskKind {
    /// The subject user's profile record.
    FetchUser,
    /// The candidate items (ranking) or the target item (review).
    FetchItems,
    /// The subject user's review history.
    FetchReviews,
    /// No recognized data need — skipped by the gatherer.
    Unrecognized,
}

/// One unit of a plan: what to retrieve and how to reason about it.
#[derive(Debug, Clone)]
pub struct SubTask {
    /// Free text shown in traces; the source of the `kind` tag.
    pub description: String,
    /// Free text; the sentinel "None" means no special instruction.
    pub reasoning_instruction: String,
    /// Optional data hint (e.g. an identity to look up).
    pub tool_instruction: Option<String>,
    /// The dispatch tag derived from `description` at parse time.
    pub kind: SubTaskKind,
}

/// The planning module. Stateless per call — safe to share.
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    model: String,
}

const PLAN_TEMPERATURE: f32 = 0.1;
const PLAN_MAX_TOKENS: u32 = 1000;

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Produce an ordered plan for the given task description.
    ///
    /// `feedback` is empty on the first attempt; a non-empty value
    /// switches to the reflexion prompt variant for re-planning.
    pub async fn plan(
        &self,
        kind: TaskKind,
        task_description: &str,
        feedback: &str,
    ) -> Result<Vec<SubTask>> {
        let prompt = build_prompt(kind, task_description, feedback);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            temperature: PLAN_TEMPERATURE,
            max_tokens: Some(PLAN_MAX_TOKENS),
            stop: Vec::new(),
            n: 1,
        };

        let response = self.llm.chat(request).await.map_err(usersim_core::Error::Llm)?;
        let plan = parse_plan(response.text())?;
        debug!(task_kind = %kind, sub_tasks = plan.len(), "Plan produced");
        Ok(plan)
    }
}

/// Build the planning prompt. The zero-feedback variant carries only the
/// few-shot examples; the feedback variant appends the reflexion text.
fn build_prompt(kind: TaskKind, task_description: &str, feedback: &str) -> String {
    let examples = "\
Task: I need to find some information to complete a recommendation task.
sub-task 1: {\"description\": \"First I need to find user information\", \"reasoning instruction\": \"None\"}
sub-task 2: {\"description\": \"Next, I need to find item information\", \"reasoning instruction\": \"None\"}
sub-task 3: {\"description\": \"Next, I need to find review information\", \"reasoning instruction\": \"None\"}";

    if feedback.is_empty() {
        format!(
            "You are a planner who divides a {kind} task into several subtasks. \
You also need to give the reasoning instructions for each subtask. \
Your output format should follow the example below.\n\
The following are some examples:\n{examples}\n\nTask: {task_description}\n"
        )
    } else {
        format!(
            "You are a planner who divides a {kind} task into several subtasks. \
You also need to give the reasoning instructions for each subtask. \
Your output format should follow the example below.\n\
The following are some examples:\n{examples}\n\nend\n\
--------------------\n\
Reflexion:{feedback}\n\
Task:{task_description}\n"
        )
    }
}

/// The JSON record a sub-task line carries. Field names use the spaced
/// spelling the few-shot examples teach the model.
#[derive(Debug, Deserialize)]
struct RawSubTask {
    description: String,
    #[serde(rename = "reasoning instruction", default = "none_sentinel")]
    reasoning_instruction: String,
    #[serde(rename = "tool use instruction", default)]
    tool_instruction: Option<serde_json::Value>,
}

fn none_sentinel() -> String {
    "None".to_string()
}

/// Parse the planner's raw completion into ordered sub-tasks.
///
/// Surrounding commentary is ignored; only lines carrying a `sub-task`
/// marker with a JSON object are lifted. Line order becomes plan order.
pub fn parse_plan(raw: &str) -> std::result::Result<Vec<SubTask>, PlanError> {
    let mut plan = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if !trimmed.to_lowercase().starts_with("sub-task") {
            continue;
        }
        let Some(start) = trimmed.find('{') else {
            continue;
        };
        let Some(end) = trimmed.rfind('}') else {
            continue;
        };
        if end < start {
            continue;
        }

        match serde_json::from_str::<RawSubTask>(&trimmed[start..=end]) {
            Ok(raw_task) => {
                let kind = classify(&raw_task.description);
                plan.push(SubTask {
                    kind,
                    tool_instruction: raw_task.tool_instruction.map(stringify_hint),
                    description: raw_task.description,
                    reasoning_instruction: raw_task.reasoning_instruction,
                });
            }
            Err(e) => {
                warn!(line = trimmed, error = %e, "Skipping malformed sub-task record");
            }
        }
    }

    if plan.is_empty() {
        return Err(PlanError::NoSubTasks);
    }
    Ok(plan)
}

/// Classify a sub-task description into its dispatch tag.
///
/// Precedence for descriptions naming several data sources:
/// user > item/business > review.
fn classify(description: &str) -> SubTaskKind {
    let lower = description.to_lowercase();
    if lower.contains("user") {
        SubTaskKind::FetchUser
    } else if lower.contains("item") || lower.contains("business") {
        SubTaskKind::FetchItems
    } else if lower.contains("review") {
        SubTaskKind::FetchReviews
    } else {
        SubTaskKind::Unrecognized
    }
}

fn stringify_hint(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
