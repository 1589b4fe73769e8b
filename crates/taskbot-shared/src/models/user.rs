use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat user. `user_id` is the chat platform account id, never generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(
        default,
        with = "crate::datetime::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub registered_at: Option<DateTime<Utc>>,
}

pub fn default_role() -> String {
    "user".to_string()
}

impl User {
    /// Full name, falling back to the username.
    pub fn display_name(&self) -> Option<&str> {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.username.as_deref().filter(|name| !name.trim().is_empty()))
    }
}
