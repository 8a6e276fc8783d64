//! Context gathering — turns a plan into budget-bounded prompt fragments.
//!
//! For each sub-task, in plan order, the gatherer fetches the referenced
//! records through the `InteractionStore`, stringifies them, and
//! truncates the result against the token budget. Fragments land in
//! fixed slots; a later sub-task of the same kind overwrites the slot.
//!
//! # Determinism
//!
//! Gathering is deterministic: identical plan, task, and store contents
//! always produce identical fragments.

use crate::planner::{SubTask, SubTaskKind};
use crate::token::TokenCodec;
use std::sync::Arc;
use tracing::{debug, warn};
use usersim_core::{InteractionStore, Result, Task, TaskKind};

/// Default fragment budget, in encoded tokens.
pub const DEFAULT_CONTEXT_BUDGET: usize = 21_000;

/// A budget-bounded text blob derived from one data lookup.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub text: String,
    /// Encoded length of `text`. Invariant: `tokens <= budget`.
    pub tokens: usize,
    /// True when the retrieval exceeded the budget and was cut.
    pub truncated: bool,
}

/// The fragment slots one resolution accumulates.
#[derive(Debug, Clone, Default)]
pub struct ContextBundle {
    pub user: Option<Fragment>,
    pub items: Option<Fragment>,
    pub reviews: Option<Fragment>,
}

impl ContextBundle {
    pub fn user_text(&self) -> &str {
        self.user.as_ref().map(|f| f.text.as_str()).unwrap_or("")
    }

    pub fn items_text(&self) -> &str {
        self.items.as_ref().map(|f| f.text.as_str()).unwrap_or("")
    }

    pub fn reviews_text(&self) -> &str {
        self.reviews.as_ref().map(|f| f.text.as_str()).unwrap_or("")
    }

    /// Per-slot statistics for the resolution report.
    pub fn stats(&self) -> Vec<FragmentStats> {
        [
            ("user", &self.user),
            ("items", &self.items),
            ("reviews", &self.reviews),
        ]
        .into_iter()
        .filter_map(|(slot, frag)| {
            frag.as_ref().map(|f| FragmentStats {
                slot,
                tokens: f.tokens,
                truncated: f.truncated,
            })
        })
        .collect()
    }
}

/// Statistics for one filled fragment slot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FragmentStats {
    pub slot: &'static str,
    pub tokens: usize,
    pub truncated: bool,
}

/// The context gatherer. Stateless across resolutions — share freely.
pub struct ContextGatherer {
    store: Arc<dyn InteractionStore>,
    codec: Arc<dyn TokenCodec>,
    budget: usize,
}

impl ContextGatherer {
    pub fn new(store: Arc<dyn InteractionStore>, codec: Arc<dyn TokenCodec>) -> Self {
        Self {
            store,
            codec,
            budget: DEFAULT_CONTEXT_BUDGET,
        }
    }

    /// Override the fragment token budget.
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    /// Execute the plan's sub-tasks strictly in order, filling fragment
    /// slots. Unrecognized sub-tasks are skipped; missing identifiers
    /// propagate as data-not-found errors.
    pub async fn gather(&self, plan: &[SubTask], task: &Task) -> Result<ContextBundle> {
        let mut bundle = ContextBundle::default();

        for sub_task in plan {
            match sub_task.kind {
                SubTaskKind::FetchUser => {
                    let record = self.store.get_user(task.user_id()?).await?;
                    bundle.user = Some(self.make_fragment(value_to_text(&record))?);
                }
                SubTaskKind::FetchItems => {
                    let text = self.fetch_items_text(task).await?;
                    bundle.items = Some(self.make_fragment(text)?);
                }
                SubTaskKind::FetchReviews => {
                    let records = self.store.get_reviews(task.user_id()?).await?;
                    bundle.reviews =
                        Some(self.make_fragment(value_to_text(&serde_json::Value::Array(records)))?);
                }
                SubTaskKind::Unrecognized => {
                    debug!(description = %sub_task.description, "Skipping unrecognized sub-task");
                }
            }
        }

        Ok(bundle)
    }

    /// Ranking tasks pull every candidate; review tasks pull the single
    /// target item. The aggregate is stringified before truncation.
    async fn fetch_items_text(&self, task: &Task) -> Result<String> {
        match task.kind {
            TaskKind::Ranking => {
                let mut records = Vec::new();
                for item_id in task.candidate_list()? {
                    records.push(self.store.get_item(&item_id).await?);
                }
                Ok(value_to_text(&serde_json::Value::Array(records)))
            }
            TaskKind::Review => {
                let record = self.store.get_item(task.item_id()?).await?;
                Ok(value_to_text(&record))
            }
        }
    }

    fn make_fragment(&self, text: String) -> Result<Fragment> {
        let tokens = self.codec.count(&text)?;
        if tokens <= self.budget {
            return Ok(Fragment {
                text,
                tokens,
                truncated: false,
            });
        }

        warn!(tokens, budget = self.budget, "Fragment over budget, truncating");
        let cut = self.codec.truncate(&text, self.budget)?;
        let cut_tokens = self.codec.count(&cut)?;
        Ok(Fragment {
            text: cut,
            tokens: cut_tokens,
            truncated: true,
        })
    }
}

fn value_to_text(value: &serde_json::Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockStore, WordCodec, sub_task};
    use serde_json::json;
    use usersim_core::{DataError, Error};

    fn ranking_task() -> Task {
        Task::new(
            "t1",
            TaskKind::Ranking,
            json!({"user_id": "u1", "candidate_list": ["i1", "i2"]}),
        )
    }

    fn gatherer(store: Arc<MockStore>) -> ContextGatherer {
        ContextGatherer::new(store, Arc::new(WordCodec))
    }

    #[tokio::test]
    async fn visits_sub_tasks_in_plan_order() {
        let store = Arc::new(MockStore::default());
        let g = gatherer(store.clone());
        let plan = vec![
            sub_task(SubTaskKind::FetchReviews),
            sub_task(SubTaskKind::FetchUser),
            sub_task(SubTaskKind::FetchItems),
        ];

        let bundle = g.gather(&plan, &ranking_task()).await.unwrap();

        assert_eq!(
            store.calls(),
            vec!["reviews:u1", "user:u1", "item:i1", "item:i2"]
        );
        assert!(bundle.user.is_some());
        assert!(bundle.items.is_some());
        assert!(bundle.reviews.is_some());
    }

    #[tokio::test]
    async fn last_write_wins_per_slot() {
        let store = Arc::new(MockStore::default());
        let g = gatherer(store.clone());
        let plan = vec![
            sub_task(SubTaskKind::FetchUser),
            sub_task(SubTaskKind::FetchUser),
        ];

        let bundle = g.gather(&plan, &ranking_task()).await.unwrap();

        // Both sub-tasks executed, one fragment in the slot
        assert_eq!(store.calls(), vec!["user:u1", "user:u1"]);
        assert_eq!(bundle.stats().len(), 1);
    }

    #[tokio::test]
    async fn unrecognized_sub_tasks_are_skipped() {
        let store = Arc::new(MockStore::default());
        let g = gatherer(store.clone());
        let plan = vec![sub_task(SubTaskKind::Unrecognized)];

        let bundle = g.gather(&plan, &ranking_task()).await.unwrap();

        assert!(store.calls().is_empty());
        assert!(bundle.stats().is_empty());
    }

    #[tokio::test]
    async fn review_task_fetches_single_target_item() {
        let store = Arc::new(MockStore::default());
        let g = gatherer(store.clone());
        let task = Task::new(
            "t2",
            TaskKind::Review,
            json!({"user_id": "u1", "business_id": "b7"}),
        );
        let plan = vec![sub_task(SubTaskKind::FetchItems)];

        g.gather(&plan, &task).await.unwrap();
        assert_eq!(store.calls(), vec!["item:b7"]);
    }

    #[tokio::test]
    async fn over_budget_fragments_are_truncated_not_rejected() {
        let store = Arc::new(MockStore::default().with_user(
            "u1",
            json!({"bio": "word ".repeat(50).trim()}),
        ));
        let g = ContextGatherer::new(store, Arc::new(WordCodec)).with_budget(5);
        let plan = vec![sub_task(SubTaskKind::FetchUser)];

        let bundle = g.gather(&plan, &ranking_task()).await.unwrap();
        let frag = bundle.user.unwrap();
        assert!(frag.truncated);
        assert!(frag.tokens <= 5);
    }

    #[tokio::test]
    async fn missing_item_propagates_not_found() {
        let store = Arc::new(MockStore::default().without_item("i2"));
        let g = gatherer(store);
        let plan = vec![sub_task(SubTaskKind::FetchItems)];

        let err = g.gather(&plan, &ranking_task()).await.unwrap_err();
        assert!(matches!(err, Error::Data(DataError::ItemNotFound(_))));
    }
}
