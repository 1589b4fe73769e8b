use serde::de::DeserializeOwned;
use serde_json::Value;
use taskbot_shared::api::{
    AddCommentPayload, CreateProjectPayload, CreateTaskPayload, NewTask, UpdateTaskStatusPayload,
    WebAppAction, WebAppEnvelope,
};
use taskbot_store::TaskRepository;

use super::{CommandDispatcher, Sender};
use crate::error::{CommandError, OrFail};
use crate::reply::{self, Reply};

/// Route a mini app payload to its action.
pub async fn handle_payload(
    dispatcher: &CommandDispatcher,
    sender: &Sender,
    data: &str,
) -> Result<Reply, CommandError> {
    let value: Value =
        serde_json::from_str(data).map_err(|e| CommandError::Parse(e.to_string()))?;
    tracing::info!("Received data from mini app ({}): {}", sender.id, value);

    if !value.is_object() {
        return Ok(Reply::text(reply::unknown_command()));
    }

    let envelope = WebAppEnvelope::from_value(&value);
    let Some(name) = envelope.action.as_deref() else {
        return Ok(Reply::text(reply::unknown_command()));
    };
    let Some(action) = WebAppAction::from_name(name) else {
        return Ok(Reply::text(reply::acknowledgment(&envelope)));
    };

    let repo = dispatcher.repo()?;
    match action {
        WebAppAction::CreateTask => create_task(repo, sender, payload(action, value)?).await,
        WebAppAction::CreateProject => create_project(repo, sender, payload(action, value)?).await,
        WebAppAction::UpdateTaskStatus => {
            update_task_status(repo, sender, payload(action, value)?).await
        }
        WebAppAction::AddComment => add_comment(repo, sender, payload(action, value)?).await,
    }
}

fn payload<T: DeserializeOwned>(action: WebAppAction, value: Value) -> Result<T, CommandError> {
    serde_json::from_value(value).map_err(|e| {
        CommandError::Validation(format!("❌ Invalid {} data: {}", action.name(), e))
    })
}

fn required(field: &str, value: &str) -> Result<(), CommandError> {
    if value.trim().is_empty() {
        return Err(CommandError::Validation(format!("❌ {} is required", field)));
    }
    Ok(())
}

async fn create_task(
    repo: &TaskRepository,
    sender: &Sender,
    payload: CreateTaskPayload,
) -> Result<Reply, CommandError> {
    required("Task title", &payload.title)?;

    // Verify project access
    let project = repo
        .find_accessible_project(sender.id, payload.project_id)
        .await
        .or_fail(reply::TASK_FAILED)?;
    if project.is_none() {
        return Err(CommandError::NoAccess("Project"));
    }

    let task = NewTask::new(
        payload.title.trim(),
        payload.description.unwrap_or_default(),
        payload.project_id,
        sender.id,
    )
    .with_priority(payload.priority.unwrap_or_default())
    .with_assignee(payload.assignee_id)
    .with_due_date(payload.due_date);

    let task_id = repo.create_task(task).await.or_fail(reply::TASK_FAILED)?;

    Ok(Reply::text(format!(
        "✅ Task '{}' created successfully! (ID: {})",
        payload.title.trim(),
        task_id
    )))
}

async fn create_project(
    repo: &TaskRepository,
    sender: &Sender,
    payload: CreateProjectPayload,
) -> Result<Reply, CommandError> {
    required("Project name", &payload.name)?;

    let name = payload.name.trim();
    let project_id = repo
        .create_project(name, payload.description.as_deref().unwrap_or(""), sender.id)
        .await
        .or_fail(reply::PROJECT_FAILED)?;

    Ok(Reply::text(format!(
        "✅ Project '{}' created successfully! (ID: {})",
        name, project_id
    )))
}

async fn update_task_status(
    repo: &TaskRepository,
    sender: &Sender,
    payload: UpdateTaskStatusPayload,
) -> Result<Reply, CommandError> {
    let task = repo
        .find_accessible_task(sender.id, payload.task_id)
        .await
        .or_fail(reply::STATUS_FAILED)?
        .ok_or(CommandError::NoAccess("Task"))?;

    let statuses = repo
        .list_task_statuses()
        .await
        .or_fail(reply::STATUS_FAILED)?;
    let Some(status) = statuses.iter().find(|s| s.status_id == payload.status_id) else {
        return Err(CommandError::Validation(reply::unknown_status(&statuses)));
    };

    match repo.update_task_status(payload.task_id, status.status_id).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => return Err(CommandError::NoAccess("Task")),
        Err(e) => return Err(CommandError::Failed { message: reply::STATUS_FAILED, source: e }),
    }

    Ok(Reply::text(format!(
        "✅ Task '{}' moved to {}!",
        task.task.title, status.name
    )))
}

async fn add_comment(
    repo: &TaskRepository,
    sender: &Sender,
    payload: AddCommentPayload,
) -> Result<Reply, CommandError> {
    required("Comment message", &payload.message)?;

    let task = repo
        .find_accessible_task(sender.id, payload.task_id)
        .await
        .or_fail(reply::COMMENT_FAILED)?
        .ok_or(CommandError::NoAccess("Task"))?;

    let comment_id = repo
        .add_comment(payload.task_id, sender.id, payload.message.trim())
        .await
        .or_fail(reply::COMMENT_FAILED)?;

    Ok(Reply::text(format!(
        "✅ Comment added to '{}'! (ID: {})",
        task.task.title, comment_id
    )))
}
