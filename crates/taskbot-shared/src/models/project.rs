use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub project_id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_by: i64,
    #[serde(with = "crate::datetime::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Creator is implicitly authorized over the project.
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.created_by == user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMember {
    pub project_id: i64,
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_in_project: Option<String>,
}

pub fn default_member_role() -> String {
    "member".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMemberWithUser {
    #[serde(flatten)]
    pub member: ProjectMember,
    pub display_name: String,
}
