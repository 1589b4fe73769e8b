use serde::{Deserialize, Serialize};

use crate::models::default_role;

/// Profile written on every registration. Optional fields are sent as `null`
/// so re-registration overwrites them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub user_id: i64,
    pub username: Option<String>,
    pub full_name: String,
    pub email: Option<String>,
    pub role: String,
}

impl NewUser {
    pub fn new(user_id: i64, username: Option<String>, full_name: impl Into<String>) -> Self {
        Self {
            user_id,
            username,
            full_name: full_name.into(),
            email: None,
            role: default_role(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }
}
