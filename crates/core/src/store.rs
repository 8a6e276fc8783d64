//! InteractionStore trait — the abstraction over the platform dataset.
//!
//! The store hands back opaque JSON records for users, items, and review
//! histories. The workflow stringifies whatever it gets; record layout is
//! owned by the dataset, not by this crate.

use crate::error::DataError;
use async_trait::async_trait;

/// Read access to the platform dataset backing a task set.
///
/// Every lookup may fail with a not-found condition; the workflow treats
/// that as a failed resolution for the current task only.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Fetch one user record by id.
    async fn get_user(&self, user_id: &str) -> std::result::Result<serde_json::Value, DataError>;

    /// Fetch one item record by id.
    async fn get_item(&self, item_id: &str) -> std::result::Result<serde_json::Value, DataError>;

    /// Fetch the review history written by a user. An empty history is
    /// not an error — a user may simply have no reviews yet.
    async fn get_reviews(
        &self,
        user_id: &str,
    ) -> std::result::Result<Vec<serde_json::Value>, DataError>;
}
