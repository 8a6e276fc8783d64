//! Run reports — per-task outcomes, aggregate scores, JSON output.
//!
//! A batch run records one entry per task resolution, succeeded or
//! failed, then scores the succeeded ones against groundtruth when a
//! groundtruth directory is configured. Failed tasks stay visible in the
//! report; they are never folded into the scores.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use usersim_agent::{FragmentStats, Resolution};
use usersim_core::{Error, Result, TaskOutput};
use usersim_data::pair_key;

/// One task's outcome within a batch run.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskReport {
    Done {
        task_id: String,
        output: TaskOutput,
        plan_len: usize,
        context: Vec<FragmentStats>,
    },
    Failed {
        task_id: String,
        error: String,
    },
}

impl TaskReport {
    pub fn done(resolution: Resolution) -> Self {
        Self::Done {
            task_id: resolution.task_id,
            output: resolution.output,
            plan_len: resolution.plan_len,
            context: resolution.context,
        }
    }

    pub fn failed(task_id: impl Into<String>, error: &Error) -> Self {
        Self::Failed {
            task_id: task_id.into(),
            error: error.to_string(),
        }
    }

    pub fn task_id(&self) -> &str {
        match self {
            Self::Done { task_id, .. } | Self::Failed { task_id, .. } => task_id,
        }
    }
}

/// The aggregate output of one batch run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<TaskReport>,
    pub evaluation: Evaluation,
}

/// Scores per task kind; absent when no task of that kind was scored.
#[derive(Debug, Default, Serialize)]
pub struct Evaluation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<RankingScores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewScores>,
}

#[derive(Debug, Serialize)]
pub struct RankingScores {
    /// Succeeded ranking tasks with groundtruth available.
    pub evaluated: usize,
    /// Fraction whose top-ranked item is the groundtruth item.
    pub top1_hit_rate: f64,
    /// Mean of 1/rank of the groundtruth item (0 when absent).
    pub mean_reciprocal_rank: f64,
}

#[derive(Debug, Serialize)]
pub struct ReviewScores {
    /// Succeeded review tasks with groundtruth available.
    pub evaluated: usize,
    /// Mean absolute star-rating error.
    pub star_mae: f64,
    /// Mean absolute error over the three engagement counts.
    pub engagement_mae: f64,
}

/// Score succeeded tasks against groundtruth records.
pub fn evaluate(
    results: &[TaskReport],
    groundtruth: &HashMap<String, serde_json::Value>,
) -> Evaluation {
    let mut ranking_hits = 0usize;
    let mut ranking_rr = 0.0f64;
    let mut ranking_n = 0usize;

    let mut star_err = 0.0f64;
    let mut engagement_err = 0.0f64;
    let mut review_n = 0usize;

    for report in results {
        let TaskReport::Done { task_id, output, .. } = report else {
            continue;
        };
        let Some(truth) = groundtruth.get(&pair_key(task_id)) else {
            continue;
        };

        match output {
            TaskOutput::Ranking { items, .. } => {
                let Some(target) = truth
                    .get("item_id")
                    .or_else(|| truth.get("business_id"))
                    .and_then(|v| v.as_str())
                else {
                    continue;
                };
                ranking_n += 1;
                if items.first().is_some_and(|top| top == target) {
                    ranking_hits += 1;
                }
                if let Some(pos) = items.iter().position(|i| i == target) {
                    ranking_rr += 1.0 / (pos as f64 + 1.0);
                }
            }
            TaskOutput::Review(record) => {
                let Some(true_stars) = truth.get("stars").and_then(|v| v.as_f64()) else {
                    continue;
                };
                review_n += 1;
                star_err += (f64::from(record.stars) - true_stars).abs();

                let counts = [
                    (record.useful, "useful"),
                    (record.funny, "funny"),
                    (record.cool, "cool"),
                ];
                let mut count_err = 0.0;
                for (predicted, field) in counts {
                    let true_count = truth.get(field).and_then(|v| v.as_f64()).unwrap_or(0.0);
                    count_err += (f64::from(predicted) - true_count).abs();
                }
                engagement_err += count_err / 3.0;
            }
        }
    }

    Evaluation {
        ranking: (ranking_n > 0).then(|| RankingScores {
            evaluated: ranking_n,
            top1_hit_rate: ranking_hits as f64 / ranking_n as f64,
            mean_reciprocal_rank: ranking_rr / ranking_n as f64,
        }),
        review: (review_n > 0).then(|| ReviewScores {
            evaluated: review_n,
            star_mae: star_err / review_n as f64,
            engagement_mae: engagement_err / review_n as f64,
        }),
    }
}

/// Write the report as pretty-printed JSON, creating parent directories.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| Error::Internal(format!(
            "Failed to create report directory {}: {e}",
            parent.display()
        )))?;
    }

    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .map_err(|e| Error::Internal(format!("Failed to write report {}: {e}", path.display())))
}
