use taskbot_store::TaskRepository;

use super::{CommandDispatcher, Sender};
use crate::commands::split_first;
use crate::error::{CommandError, OrFail};
use crate::reply::{self, Reply};

/// /myprojects
pub async fn my_projects(repo: &TaskRepository, sender: &Sender) -> Result<Reply, CommandError> {
    let projects = repo.list_projects_for_user(sender.id).await?;

    if projects.is_empty() {
        return Ok(Reply::text(reply::NO_PROJECTS));
    }

    Ok(Reply::text(reply::projects(&projects)))
}

/// /createproject <name> [description]
pub async fn create_project(
    dispatcher: &CommandDispatcher,
    sender: &Sender,
    args: &str,
) -> Result<Reply, CommandError> {
    let repo = dispatcher.repo()?;

    let (name, description) = split_first(args);
    if name.is_empty() {
        return Ok(Reply::text(reply::CREATE_PROJECT_USAGE));
    }

    let project_id = repo
        .create_project(name, description, sender.id)
        .await
        .or_fail(reply::PROJECT_FAILED)?;

    Ok(Reply::text(format!(
        "✅ Project '{}' created successfully! (ID: {})",
        name, project_id
    )))
}
