//! File-based dataset store — read-only JSON records.
//!
//! Loads `users.json`, `items.json`, and `reviews.json` from a data
//! directory into memory once, then serves lookups from HashMaps. Each
//! file may be either a JSON array of objects or JSON-lines (one object
//! per line); malformed records are skipped with a warning.
//!
//! The store is read-only after load, so concurrent task resolutions can
//! share one instance without locking.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};
use usersim_core::error::DataError;
use usersim_core::{Error, InteractionStore, Result};

/// An in-memory dataset loaded from JSON files.
#[derive(Debug)]
pub struct JsonInteractionStore {
    users: HashMap<String, serde_json::Value>,
    items: HashMap<String, serde_json::Value>,
    reviews_by_user: HashMap<String, Vec<serde_json::Value>>,
}

impl JsonInteractionStore {
    /// Load the dataset from `data_dir`.
    ///
    /// Expects `users.json`, `items.json`, and `reviews.json` inside the
    /// directory. A missing file is a storage error — a task set without
    /// its dataset cannot be resolved.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let users = index_records(&read_records(&data_dir.join("users.json"))?, &["user_id"]);
        let items = index_records(
            &read_records(&data_dir.join("items.json"))?,
            &["item_id", "business_id"],
        );

        let mut reviews_by_user: HashMap<String, Vec<serde_json::Value>> = HashMap::new();
        for record in read_records(&data_dir.join("reviews.json"))? {
            match record.get("user_id").and_then(|v| v.as_str()) {
                Some(user_id) => reviews_by_user
                    .entry(user_id.to_string())
                    .or_default()
                    .push(record),
                None => warn!("Skipping review record without user_id"),
            }
        }

        debug!(
            users = users.len(),
            items = items.len(),
            reviewers = reviews_by_user.len(),
            "Dataset loaded"
        );

        Ok(Self {
            users,
            items,
            reviews_by_user,
        })
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// Read a file of JSON records: a top-level array, or JSON-lines.
fn read_records(path: &Path) -> Result<Vec<serde_json::Value>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Data(DataError::Storage(format!(
            "Failed to read {}: {e}",
            path.display()
        )))
    })?;

    if let Ok(serde_json::Value::Array(records)) = serde_json::from_str(&content) {
        return Ok(records);
    }

    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, file = %path.display(), "Skipping corrupted record");
                None
            }
        })
        .collect())
}

/// Index records by the first of `key_fields` each record carries.
fn index_records(
    records: &[serde_json::Value],
    key_fields: &[&str],
) -> HashMap<String, serde_json::Value> {
    let mut index = HashMap::new();
    for record in records {
        let key = key_fields
            .iter()
            .find_map(|k| record.get(*k).and_then(|v| v.as_str()));
        match key {
            Some(id) => {
                index.insert(id.to_string(), record.clone());
            }
            None => warn!(keys = ?key_fields, "Skipping record without id field"),
        }
    }
    index
}

#[async_trait]
impl InteractionStore for JsonInteractionStore {
    async fn get_user(&self, user_id: &str) -> std::result::Result<serde_json::Value, DataError> {
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| DataError::UserNotFound(user_id.to_string()))
    }

    async fn get_item(&self, item_id: &str) -> std::result::Result<serde_json::Value, DataError> {
        self.items
            .get(item_id)
            .cloned()
            .ok_or_else(|| DataError::ItemNotFound(item_id.to_string()))
    }

    async fn get_reviews(
        &self,
        user_id: &str,
    ) -> std::result::Result<Vec<serde_json::Value>, DataError> {
        Ok(self.reviews_by_user.get(user_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn write_dataset(dir: &Path) {
        fs::write(
            dir.join("users.json"),
            r#"[{"user_id": "u1", "name": "Alice"}, {"user_id": "u2", "name": "Bob"}]"#,
        )
        .unwrap();
        // JSON-lines variant for items
        fs::write(
            dir.join("items.json"),
            "{\"item_id\": \"i1\", \"title\": \"Cafe\"}\n{\"business_id\": \"b1\", \"title\": \"Diner\"}\n",
        )
        .unwrap();
        fs::write(
            dir.join("reviews.json"),
            "{\"user_id\": \"u1\", \"stars\": 4.0}\n{\"user_id\": \"u1\", \"stars\": 2.0}\nnot json\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn lookups_by_id() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let store = JsonInteractionStore::load(dir.path()).unwrap();

        let user = store.get_user("u1").await.unwrap();
        assert_eq!(user["name"], json!("Alice"));

        let item = store.get_item("i1").await.unwrap();
        assert_eq!(item["title"], json!("Cafe"));

        // business_id spelling is indexed too
        assert!(store.get_item("b1").await.is_ok());
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let store = JsonInteractionStore::load(dir.path()).unwrap();

        assert!(matches!(
            store.get_user("nobody").await,
            Err(DataError::UserNotFound(_))
        ));
        assert!(matches!(
            store.get_item("nothing").await,
            Err(DataError::ItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn reviews_grouped_by_user_and_corrupt_lines_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let store = JsonInteractionStore::load(dir.path()).unwrap();

        let reviews = store.get_reviews("u1").await.unwrap();
        assert_eq!(reviews.len(), 2);

        // No reviews is an empty history, not an error
        let none = store.get_reviews("u2").await.unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn missing_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonInteractionStore::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("users.json"));
    }
}
