use taskbot_shared::api::NewTask;
use taskbot_store::TaskRepository;

use super::Sender;
use crate::commands::{split_first, split_title};
use crate::error::{CommandError, OrFail};
use crate::reply::{self, Reply};

/// /mytasks
pub async fn my_tasks(repo: &TaskRepository, sender: &Sender) -> Result<Reply, CommandError> {
    let tasks = repo.list_tasks_for_user(sender.id).await?;

    if tasks.is_empty() {
        return Ok(Reply::text(reply::NO_TASKS));
    }

    Ok(Reply::text(reply::tasks(&tasks)))
}

/// /createtask [<project_id> <title> [| description]]
pub async fn create_task(
    repo: &TaskRepository,
    sender: &Sender,
    args: &str,
) -> Result<Reply, CommandError> {
    let (project_token, rest) = split_first(args);
    if project_token.is_empty() || rest.is_empty() {
        return instructions(repo, sender).await;
    }

    let project_id: i64 = project_token
        .parse()
        .map_err(|_| CommandError::Validation(reply::INVALID_PROJECT_ID.to_string()))?;
    let (title, description) = split_title(rest);

    // Only the caller's own projects
    let project = repo
        .find_accessible_project(sender.id, project_id)
        .await
        .or_fail(reply::TASK_FAILED)?;
    if project.is_none() {
        return Err(CommandError::NoAccess("Project"));
    }

    let task_id = repo
        .create_task(NewTask::new(title, description, project_id, sender.id))
        .await
        .or_fail(reply::TASK_FAILED)?;

    Ok(Reply::text(format!(
        "✅ Task '{}' created successfully! (ID: {})",
        title, task_id
    )))
}

async fn instructions(repo: &TaskRepository, sender: &Sender) -> Result<Reply, CommandError> {
    let projects = repo.list_projects_for_user(sender.id).await?;

    if projects.is_empty() {
        return Ok(Reply::text(reply::CREATE_PROJECT_FIRST));
    }

    Ok(Reply::text(reply::create_task_instructions(&projects)))
}

/// /comments <task_id>
pub async fn comments(
    repo: &TaskRepository,
    sender: &Sender,
    args: &str,
) -> Result<Reply, CommandError> {
    let (task_token, _) = split_first(args);
    if task_token.is_empty() {
        return Ok(Reply::text(reply::COMMENTS_USAGE));
    }

    let task_id: i64 = task_token
        .parse()
        .map_err(|_| CommandError::Validation(reply::INVALID_TASK_ID.to_string()))?;

    let task = repo
        .find_accessible_task(sender.id, task_id)
        .await?
        .ok_or(CommandError::NoAccess("Task"))?;
    let comments = repo.list_comments(task_id).await?;

    Ok(Reply::text(reply::comments(&task.task.title, &comments)))
}
