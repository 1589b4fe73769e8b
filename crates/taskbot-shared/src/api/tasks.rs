use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::default_priority;

/// Fields a caller may set on a new task. The status is not one of them:
/// every task starts in the seed status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub project_id: i64,
    pub author_id: i64,
    pub priority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<i64>,
    #[serde(
        default,
        with = "crate::datetime::date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        project_id: i64,
        author_id: i64,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            project_id,
            author_id,
            priority: default_priority(),
            assignee_id: None,
            due_date: None,
        }
    }

    /// Blank priorities keep the default.
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        let priority = priority.into();
        if !priority.trim().is_empty() {
            self.priority = priority;
        }
        self
    }

    pub fn with_assignee(mut self, assignee_id: Option<i64>) -> Self {
        self.assignee_id = assignee_id;
        self
    }

    pub fn with_due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = due_date;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskStatusRequest {
    pub status_id: i64,
    #[serde(with = "crate::datetime::timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub task_id: i64,
    pub author_id: i64,
    pub message: String,
}
