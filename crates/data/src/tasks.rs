//! Task supplier — loads task sets and groundtruth from disk.
//!
//! One JSON file per task, loaded in filename order so batch runs are
//! deterministic. Task kind comes from an explicit `type` field when
//! present, otherwise it is inferred from the field shape.

use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};
use usersim_core::error::DataError;
use usersim_core::{Error, Result, Task, TaskKind};

/// An ordered set of tasks loaded from a directory.
pub struct TaskSet {
    pub tasks: Vec<Task>,
}

impl TaskSet {
    /// Load every `*.json` file in `task_dir`, sorted by filename.
    ///
    /// Files whose kind cannot be determined are skipped with a warning;
    /// an unreadable directory is a storage error.
    pub fn load(task_dir: &Path) -> Result<Self> {
        let mut tasks = Vec::new();
        for path in sorted_json_files(task_dir)? {
            let stem = file_stem(&path);
            let fields: serde_json::Value = match std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|c| serde_json::from_str(&c).map_err(|e| e.to_string()))
            {
                Ok(v) => v,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Skipping unreadable task file");
                    continue;
                }
            };

            match detect_kind(&fields) {
                Some(kind) => tasks.push(Task::new(stem, kind, fields)),
                None => {
                    warn!(file = %path.display(), "Skipping task with undeterminable kind");
                }
            }
        }

        debug!(count = tasks.len(), dir = %task_dir.display(), "Task set loaded");
        Ok(Self { tasks })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Load groundtruth records keyed to match task ids.
///
/// Groundtruth files mirror the task files one-to-one; `task_3.json`
/// pairs with `groundtruth_3.json`, and identical stems pair directly.
pub fn load_groundtruth(dir: &Path) -> Result<HashMap<String, serde_json::Value>> {
    let mut map = HashMap::new();
    for path in sorted_json_files(dir)? {
        let record: serde_json::Value = match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|c| serde_json::from_str(&c).map_err(|e| e.to_string()))
        {
            Ok(v) => v,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping unreadable groundtruth file");
                continue;
            }
        };
        map.insert(pair_key(&file_stem(&path)), record);
    }
    Ok(map)
}

/// The lookup key a task id resolves to in the groundtruth map.
pub fn pair_key(stem: &str) -> String {
    stem.strip_prefix("groundtruth_")
        .or_else(|| stem.strip_prefix("task_"))
        .unwrap_or(stem)
        .to_string()
}

fn sorted_json_files(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        Error::Data(DataError::Storage(format!(
            "Failed to read {}: {e}",
            dir.display()
        )))
    })?;

    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn detect_kind(fields: &serde_json::Value) -> Option<TaskKind> {
    if let Some(ty) = fields.get("type").and_then(|v| v.as_str()) {
        return match ty {
            "ranking" | "recommendation" => Some(TaskKind::Ranking),
            "review" | "simulation" | "user_behavior_simulation" => Some(TaskKind::Review),
            _ => None,
        };
    }
    if fields.get("candidate_list").is_some() {
        return Some(TaskKind::Ranking);
    }
    if fields.get("item_id").is_some() || fields.get("business_id").is_some() {
        return Some(TaskKind::Review);
    }
    None
}
