//! The agent workflow — one task in, one structured result out.
//!
//! Each resolution walks a fixed sequence of phases:
//!
//! 1. **Planning** — decompose the task into ordered sub-tasks (once).
//! 2. **Gathering** — execute sub-tasks in plan order, filling fragment
//!    slots under the token budget.
//! 3. **Reasoning** — build the final prompt by template substitution
//!    and issue exactly one completion call.
//! 4. **Parsing** — convert the raw completion into the task's
//!    structured result, or fail.
//!
//! There is no retry or backoff inside the workflow; a harness running
//! many tasks may re-run a whole resolution. Resolutions share no
//! mutable state, so one workflow instance can serve concurrent tasks.

use crate::context::{ContextBundle, ContextGatherer, FragmentStats};
use crate::parser;
use crate::planner::Planner;
use crate::reasoner::Reasoner;
use crate::token::TokenCodec;
use std::sync::Arc;
use tracing::{debug, info, warn};
use usersim_core::{InteractionStore, LlmClient, Result, Task, TaskKind, TaskOutput};

/// The outcome of one successful task resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub task_id: String,
    pub output: TaskOutput,
    /// How many sub-tasks the plan carried.
    pub plan_len: usize,
    /// Per-slot context statistics.
    pub context: Vec<FragmentStats>,
}

/// The agent workflow. Holds only stateless collaborators — create one
/// and reuse it across task resolutions.
pub struct AgentWorkflow {
    planner: Planner,
    gatherer: ContextGatherer,
    ranking_reasoner: Reasoner,
    review_reasoner: Reasoner,
}

impl AgentWorkflow {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn InteractionStore>,
        codec: Arc<dyn TokenCodec>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        Self {
            planner: Planner::new(llm.clone(), model.clone()),
            gatherer: ContextGatherer::new(store, codec),
            ranking_reasoner: Reasoner::for_kind(llm.clone(), model.clone(), TaskKind::Ranking),
            review_reasoner: Reasoner::for_kind(llm, model, TaskKind::Review),
        }
    }

    /// Override the context fragment token budget.
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.gatherer = self.gatherer.with_budget(budget);
        self
    }

    /// Resolve one task end to end.
    pub async fn resolve(&self, task: &Task) -> Result<Resolution> {
        info!(task_id = %task.id, kind = %task.kind, "Resolving task");

        // ── Planning ──
        let plan = self
            .planner
            .plan(task.kind, plan_description(task.kind), "")
            .await?;
        debug!(task_id = %task.id, sub_tasks = plan.len(), "Planning done");

        // ── Gathering ──
        let bundle = self.gatherer.gather(&plan, task).await?;
        debug!(task_id = %task.id, fragments = bundle.stats().len(), "Gathering done");

        // ── Reasoning ──
        let output = match task.kind {
            TaskKind::Ranking => {
                let candidates = task.candidate_list()?;
                let prompt = ranking_prompt(&bundle, &candidates);
                let raw = self.ranking_reasoner.reason(&prompt).await?;

                // ── Parsing (recoverable) ──
                let parsed = parser::parse_ranking(&raw, &candidates);
                if parsed.recovered {
                    warn!(task_id = %task.id, "Ranking output unparsable, candidate order kept");
                }
                TaskOutput::Ranking {
                    items: parsed.items,
                    recovered: parsed.recovered,
                }
            }
            TaskKind::Review => {
                let prompt = review_prompt(&bundle);
                let raw = self.review_reasoner.reason(&prompt).await?;

                // ── Parsing (hard failure on malformed output) ──
                let record = parser::parse_review(&raw)?;
                TaskOutput::Review(record)
            }
        };

        info!(task_id = %task.id, "Task resolved");
        Ok(Resolution {
            task_id: task.id.clone(),
            output,
            plan_len: plan.len(),
            context: bundle.stats(),
        })
    }
}

/// The task description handed to the planner, per kind.
fn plan_description(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Ranking => {
            "Please make a plan to query user information, you can choose to query user, item, and review information"
        }
        TaskKind::Review => {
            "Please make a plan to query the user profile and the information of the item to review, you can choose to query user and item information"
        }
    }
}

/// Final ranking prompt, built from the task fields and fragment slots.
fn ranking_prompt(bundle: &ContextBundle, candidates: &[String]) -> String {
    format!(
        "You are a user on an online review platform with the profile: {user}. \
Your historical item review text and stars are as follows: {reviews}. \
The information of the candidate items is as follows: {items}.\n\
Now you need to rank the following {count} candidate items: {list} \
according to their match degree to your preference.\n\
Your output should be only a ranked item list without any other content:\n\
['item id1', 'item id2', 'item id3', ...]\n",
        user = bundle.user_text(),
        reviews = bundle.reviews_text(),
        items = bundle.items_text(),
        count = candidates.len(),
        list = quoted_list(candidates),
    )
}

/// Final review prompt, built from the fragment slots.
fn review_prompt(bundle: &ContextBundle) -> String {
    format!(
        "You are a real human user on an online review platform. \
Here is your profile and review history: {user}\n\n\
You need to write a review for this item: {item}\n\n\
Please analyze the following aspects carefully:\n\
1. Based on your profile and review style, what rating would you give this item? \
Remember that many users give 5-star ratings for excellent experiences that exceed expectations, \
and 1-star ratings for very poor experiences that fail to meet basic standards.\n\
2. Given the item details and your past experiences, what specific aspects would you comment on?\n\
3. Consider how other users might engage with your review in terms of usefulness, humor, and insight.\n\n\
Requirements:\n\
- Star rating must be one of: 1.0, 2.0, 3.0, 4.0, 5.0\n\
- Review text should be 2-4 sentences, focusing on your personal experience and emotional response\n\
- Useful/funny/cool counts should be non-negative integers that reflect likely user engagement\n\
- Maintain consistency with your historical review style and rating patterns\n\n\
Format your response exactly as follows:\n\
stars: [your rating]\n\
useful: [count]\n\
funny: [count]\n\
cool: [count]\n\
review: [your review]\n",
        user = bundle.user_text(),
        item = bundle.items_text(),
    )
}

/// Render ids as a quoted bracketed list: `['a', 'b']`.
fn quoted_list(ids: &[String]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| format!("'{id}'")).collect();
    format!("[{}]", quoted.join(", "))
}
