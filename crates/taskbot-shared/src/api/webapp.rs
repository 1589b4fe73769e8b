//! Payloads the mini app posts back through `Telegram.WebApp.sendData`.
//!
//! Every payload is a JSON object with a string `action`; the remaining
//! fields depend on the action. Form inputs arrive as strings, so ids accept
//! both `7` and `"7"`.

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebAppAction {
    CreateTask,
    CreateProject,
    UpdateTaskStatus,
    AddComment,
}

impl WebAppAction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "create_task" => Some(Self::CreateTask),
            "create_project" => Some(Self::CreateProject),
            "update_task_status" => Some(Self::UpdateTaskStatus),
            "add_comment" => Some(Self::AddComment),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateTask => "create_task",
            Self::CreateProject => "create_project",
            Self::UpdateTaskStatus => "update_task_status",
            Self::AddComment => "add_comment",
        }
    }
}

/// The part of a payload every action shares, plus the fields echoed back
/// for actions the bot does not know.
///
/// Read field by field: a `timestamp` from `Date.now()` or any other
/// unexpected shape never hides the `action`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebAppEnvelope {
    pub action: Option<String>,
    pub message: Option<Value>,
    pub timestamp: Option<Value>,
}

impl WebAppEnvelope {
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| value.get(name).filter(|v| !v.is_null()).cloned();
        Self {
            action: value
                .get("action")
                .and_then(Value::as_str)
                .map(str::to_string),
            message: field("message"),
            timestamp: field("timestamp"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskPayload {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "flexible_id")]
    pub project_id: i64,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "flexible_optional_id")]
    pub assignee_id: Option<i64>,
    #[serde(default, with = "crate::datetime::date::option")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectPayload {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTaskStatusPayload {
    #[serde(deserialize_with = "flexible_id")]
    pub task_id: i64,
    #[serde(deserialize_with = "flexible_id")]
    pub status_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddCommentPayload {
    #[serde(deserialize_with = "flexible_id")]
    pub task_id: i64,
    pub message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    fn into_id<E: de::Error>(self) -> Result<Option<i64>, E> {
        match self {
            RawId::Number(id) => Ok(Some(id)),
            RawId::Text(text) if text.trim().is_empty() => Ok(None),
            RawId::Text(text) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| E::custom(format!("expected a numeric id, got {:?}", text))),
        }
    }
}

fn flexible_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    RawId::deserialize(deserializer)?
        .into_id()?
        .ok_or_else(|| de::Error::custom("id must not be empty"))
}

fn flexible_optional_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    match Option::<RawId>::deserialize(deserializer)? {
        Some(raw) => raw.into_id(),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_accept_numbers_and_strings() {
        let payload: UpdateTaskStatusPayload =
            serde_json::from_value(json!({ "task_id": "12", "status_id": 3 })).unwrap();
        assert_eq!((payload.task_id, payload.status_id), (12, 3));

        let bad = serde_json::from_value::<UpdateTaskStatusPayload>(
            json!({ "task_id": "twelve", "status_id": 3 }),
        );
        assert!(bad.is_err());
    }

    #[test]
    fn create_task_tolerates_blank_optional_fields() {
        let payload: CreateTaskPayload = serde_json::from_value(json!({
            "action": "create_task",
            "title": "Write docs",
            "project_id": 5,
            "assignee_id": "",
            "due_date": "",
            "status_id": 4
        }))
        .unwrap();

        assert_eq!(payload.project_id, 5);
        assert!(payload.assignee_id.is_none());
        assert!(payload.due_date.is_none());
    }

    #[test]
    fn action_names_round_trip() {
        for action in [
            WebAppAction::CreateTask,
            WebAppAction::CreateProject,
            WebAppAction::UpdateTaskStatus,
            WebAppAction::AddComment,
        ] {
            assert_eq!(WebAppAction::from_name(action.name()), Some(action));
        }
        assert_eq!(WebAppAction::from_name("delete_task"), None);
    }

    #[test]
    fn envelope_keeps_action_next_to_odd_fields() {
        let envelope = WebAppEnvelope::from_value(&json!({
            "action": "create_project",
            "name": "Mobile",
            "timestamp": 1709287200000i64,
            "message": { "nested": true }
        }));

        assert_eq!(envelope.action.as_deref(), Some("create_project"));
        assert_eq!(envelope.timestamp, Some(json!(1709287200000i64)));
        assert_eq!(envelope.message, Some(json!({ "nested": true })));

        let numeric_action = WebAppEnvelope::from_value(&json!({ "action": 3 }));
        assert_eq!(numeric_action, WebAppEnvelope::default());
    }
}
