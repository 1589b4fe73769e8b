use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_PRIORITY: &str = "medium";

/// Status every new task starts in ("To Do", order_index 1).
pub const INITIAL_STATUS_ID: i64 = 1;

/// The fixed status set the store is seeded with: (status_id, name, order_index).
pub const SEED_STATUSES: [(i64, &str, i32); 4] = [
    (1, "To Do", 1),
    (2, "In Progress", 2),
    (3, "In Review", 3),
    (4, "Done", 4),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub project_id: i64,
    pub status_id: i64,
    pub author_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<i64>,
    #[serde(default = "default_priority", deserialize_with = "priority_or_default")]
    pub priority: String,
    #[serde(
        default,
        with = "crate::datetime::date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(with = "crate::datetime::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::datetime::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn involves(&self, user_id: i64) -> bool {
        self.author_id == user_id || self.assignee_id == Some(user_id)
    }
}

pub fn default_priority() -> String {
    DEFAULT_PRIORITY.to_string()
}

fn priority_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|priority| !priority.trim().is_empty())
        .unwrap_or_else(default_priority))
}

/// A task joined with the display names of its status and project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskWithDetails {
    #[serde(flatten)]
    pub task: Task,
    pub status_name: String,
    pub project_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub status_id: i64,
    pub name: String,
    pub order_index: i32,
}

impl TaskStatus {
    pub fn seed() -> Vec<TaskStatus> {
        SEED_STATUSES
            .iter()
            .map(|(status_id, name, order_index)| TaskStatus {
                status_id: *status_id,
                name: name.to_string(),
                order_index: *order_index,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_store_row_with_nulls() {
        let task: Task = serde_json::from_value(json!({
            "task_id": 3,
            "title": "Fix homepage",
            "description": null,
            "project_id": 1,
            "status_id": 1,
            "author_id": 42,
            "assignee_id": null,
            "priority": null,
            "due_date": "2025-01-31T00:00:00",
            "created_at": "2025-01-01T09:30:00.000001+00:00",
            "updated_at": "2025-01-01T09:30:00.000001"
        }))
        .unwrap();

        assert_eq!(task.priority, "medium");
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2025, 1, 31));
        assert_eq!(task.created_at, task.updated_at);
        assert!(task.involves(42));
        assert!(!task.involves(7));
    }

    #[test]
    fn seed_is_ordered_and_starts_with_initial_status() {
        let seed = TaskStatus::seed();
        assert_eq!(seed.len(), 4);
        assert_eq!(seed[0].status_id, INITIAL_STATUS_ID);
        assert_eq!(seed[0].name, "To Do");
        assert!(seed.windows(2).all(|pair| pair[0].order_index < pair[1].order_index));
    }
}
