//! Configuration loading and validation for usersim.
//!
//! Loads a TOML file with environment variable overrides. Validates all
//! settings before a run starts so misconfiguration aborts early instead
//! of failing tasks one by one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use usersim_core::{Error, Result};

/// The root configuration structure, mapping directly to the TOML file.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct HarnessConfig {
    /// Completion service settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Context assembly settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// Dataset and task locations.
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key for the completion service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name sent with every request.
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "qwen2.5-72b-instruct".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Token budget for each context fragment.
    #[serde(default = "default_budget")]
    pub budget: usize,

    /// Path to a HuggingFace `tokenizer.json`. When unset, a
    /// character-based heuristic codec is used instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_path: Option<PathBuf>,
}

fn default_budget() -> usize {
    21_000
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            tokenizer_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding `users.json`, `items.json`, `reviews.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding one task JSON file per resolution.
    #[serde(default = "default_task_dir")]
    pub task_dir: PathBuf,

    /// Optional groundtruth directory for evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groundtruth_dir: Option<PathBuf>,

    /// Where the run report is written.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_task_dir() -> PathBuf {
    PathBuf::from("./tasks")
}
fn default_output_path() -> PathBuf {
    PathBuf::from("./evaluation_results.json")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            task_dir: default_task_dir(),
            groundtruth_dir: None,
            output_path: default_output_path(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl std::fmt::Debug for HarnessConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarnessConfig")
            .field("llm", &self.llm)
            .field("context", &self.context)
            .field("paths", &self.paths)
            .finish()
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file, then apply environment
    /// overrides. A missing file yields the defaults (still subject to
    /// overrides), so `usersim run` works with env-only setups.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p).map_err(|e| Error::Config {
                    message: format!("Failed to read config {}: {e}", p.display()),
                })?;
                toml::from_str(&content).map_err(|e| Error::Config {
                    message: format!("Failed to parse config {}: {e}", p.display()),
                })?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// Environment variables override file values:
    /// `USERSIM_API_KEY`, `USERSIM_BASE_URL`, `USERSIM_MODEL`.
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("USERSIM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("USERSIM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("USERSIM_MODEL") {
            self.llm.model = model;
        }
    }

    /// Check that a run can start. Missing credentials are fatal here,
    /// not one task at a time.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(Error::Config {
                message: "No API key configured (set llm.api_key or USERSIM_API_KEY)".into(),
            });
        }
        if self.context.budget == 0 {
            return Err(Error::Config {
                message: "context.budget must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let config = HarnessConfig::default();
        assert_eq!(config.context.budget, 21_000);
        assert!(config.llm.base_url.contains("api.openai.com"));
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn toml_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[llm]
api_key = "sk-test"
model = "deepseek-chat"

[context]
budget = 4096

[paths]
task_dir = "./track1/tasks"
"#
        )
        .unwrap();

        let config = HarnessConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.context.budget, 4096);
        assert_eq!(config.paths.task_dir, PathBuf::from("./track1/tasks"));
        // Unspecified sections keep their defaults
        assert_eq!(config.paths.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn validate_requires_api_key() {
        let config = HarnessConfig::default();
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.llm.api_key = Some("sk-test".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let mut config = HarnessConfig::default();
        config.llm.api_key = Some("sk-secret-value".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret-value"));
        assert!(debug.contains("[REDACTED]"));
    }
}
