use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::query::Query;

pub const USERS: &str = "users";
pub const PROJECTS: &str = "projects";
pub const TASKS: &str = "tasks";
pub const TASK_STATUSES: &str = "task_statuses";
pub const TASK_COMMENTS: &str = "task_comments";
pub const PROJECT_MEMBERS: &str = "project_members";

/// A collection store: filtered reads, inserts and partial updates.
///
/// Writes return the affected rows so callers can read generated keys.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    async fn select(&self, query: &Query) -> Result<Vec<Value>, StoreError>;

    async fn insert(&self, table: &'static str, row: Value) -> Result<Vec<Value>, StoreError>;

    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>, StoreError>;
}
