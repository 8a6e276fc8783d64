//! `usersim run` — resolve a task set and write the run report.

use crate::report::{self, TaskReport};
use anyhow::Context;
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use usersim_agent::{AgentWorkflow, HeuristicCodec, HfTokenCodec, TokenCodec};
use usersim_config::HarnessConfig;
use usersim_data::{JsonInteractionStore, TaskSet, load_groundtruth};
use usersim_llm::OpenAiCompatClient;

pub async fn run(
    config_path: Option<PathBuf>,
    limit: Option<usize>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = HarnessConfig::load(config_path.as_deref())?;
    config.validate()?;

    // Tokenizer unavailability is fatal before any task runs.
    let codec: Arc<dyn TokenCodec> = match &config.context.tokenizer_path {
        Some(path) => Arc::new(HfTokenCodec::from_file(path)?),
        None => Arc::new(HeuristicCodec),
    };

    let store = Arc::new(
        JsonInteractionStore::load(&config.paths.data_dir)
            .context("Failed to load dataset")?,
    );

    let api_key = config.llm.api_key.clone().unwrap_or_default();
    let client = Arc::new(OpenAiCompatClient::new(
        "openai-compat",
        &config.llm.base_url,
        api_key,
    ));

    let mut task_set = TaskSet::load(&config.paths.task_dir).context("Failed to load task set")?;
    if let Some(n) = limit {
        task_set.tasks.truncate(n);
    }
    anyhow::ensure!(!task_set.is_empty(), "Task set is empty, nothing to run");

    let workflow = AgentWorkflow::new(client, store, codec, config.llm.model.clone())
        .with_budget(config.context.budget);

    info!(tasks = task_set.len(), model = %config.llm.model, "Starting batch run");
    let started_at = Utc::now();

    // Each resolution is independent; a failed task never aborts the batch.
    let mut results = Vec::with_capacity(task_set.len());
    for task in &task_set.tasks {
        match workflow.resolve(task).await {
            Ok(resolution) => results.push(TaskReport::done(resolution)),
            Err(error) => {
                warn!(task_id = %task.id, %error, "Task resolution failed");
                results.push(TaskReport::failed(&task.id, &error));
            }
        }
    }

    let groundtruth = match &config.paths.groundtruth_dir {
        Some(dir) => load_groundtruth(dir).context("Failed to load groundtruth")?,
        None => HashMap::new(),
    };
    let evaluation = report::evaluate(&results, &groundtruth);

    let succeeded = results
        .iter()
        .filter(|r| matches!(r, TaskReport::Done { .. }))
        .count();
    let failed = results.len() - succeeded;

    let run_report = report::RunReport {
        run_id: uuid::Uuid::new_v4().to_string(),
        model: config.llm.model.clone(),
        started_at,
        finished_at: Utc::now(),
        succeeded,
        failed,
        results,
        evaluation,
    };

    let output_path = output.unwrap_or_else(|| config.paths.output_path.clone());
    report::write_report(&output_path, &run_report)?;

    info!(
        succeeded,
        failed,
        report = %output_path.display(),
        "Batch run finished"
    );
    println!(
        "Resolved {} task(s): {} succeeded, {} failed. Report: {}",
        succeeded + failed,
        succeeded,
        failed,
        output_path.display()
    );

    Ok(())
}
