//! `usersim doctor` — diagnose the harness setup before a long run.

use std::path::PathBuf;
use usersim_agent::HfTokenCodec;
use usersim_config::HarnessConfig;
use usersim_core::LlmClient;
use usersim_data::{JsonInteractionStore, TaskSet};
use usersim_llm::OpenAiCompatClient;

pub async fn run(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let mut failures = 0usize;

    let config = HarnessConfig::load(config_path.as_deref())?;
    match config.validate() {
        Ok(()) => println!("ok   config: valid"),
        Err(e) => {
            failures += 1;
            println!("FAIL config: {e}");
        }
    }

    match &config.context.tokenizer_path {
        Some(path) => match HfTokenCodec::from_file(path) {
            Ok(_) => println!("ok   tokenizer: {}", path.display()),
            Err(e) => {
                failures += 1;
                println!("FAIL tokenizer: {e}");
            }
        },
        None => println!("ok   tokenizer: none configured, using heuristic codec"),
    }

    match JsonInteractionStore::load(&config.paths.data_dir) {
        Ok(store) => println!(
            "ok   dataset: {} users, {} items",
            store.user_count(),
            store.item_count()
        ),
        Err(e) => {
            failures += 1;
            println!("FAIL dataset: {e}");
        }
    }

    match TaskSet::load(&config.paths.task_dir) {
        Ok(set) if !set.is_empty() => println!("ok   tasks: {} loaded", set.len()),
        Ok(_) => {
            failures += 1;
            println!("FAIL tasks: directory holds no usable task files");
        }
        Err(e) => {
            failures += 1;
            println!("FAIL tasks: {e}");
        }
    }

    let client = OpenAiCompatClient::new(
        "openai-compat",
        &config.llm.base_url,
        config.llm.api_key.clone().unwrap_or_default(),
    );
    match client.health_check().await {
        Ok(true) => println!("ok   provider: reachable at {}", config.llm.base_url),
        Ok(false) => {
            failures += 1;
            println!("FAIL provider: endpoint responded unhealthy");
        }
        Err(e) => {
            failures += 1;
            println!("FAIL provider: {e}");
        }
    }

    anyhow::ensure!(failures == 0, "{failures} check(s) failed");
    Ok(())
}
