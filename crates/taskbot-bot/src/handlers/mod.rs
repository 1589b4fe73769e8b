//! Command handling, independent of the chat transport.
//!
//! One [`Incoming`] message in, one [`Reply`] out. Every failure is turned
//! into a reply here, so nothing a user sends can stop the bot.

mod projects;
mod tasks;
mod users;
mod webapp;

#[cfg(test)]
mod tests;

use taskbot_store::TaskRepository;

use crate::commands::Command;
use crate::error::CommandError;
use crate::reply::{self, Reply};

/// Who sent a message, as far as the bot cares.
#[derive(Debug, Clone)]
pub struct Sender {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl Sender {
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name,
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}

#[derive(Debug, Clone)]
pub enum Content {
    Text(String),
    /// Raw `sendData` string posted by the mini app
    WebAppData(String),
}

#[derive(Debug, Clone)]
pub struct Incoming {
    pub sender: Sender,
    pub content: Content,
}

pub struct CommandDispatcher {
    repo: Option<TaskRepository>,
    web_app_url: Option<String>,
}

impl CommandDispatcher {
    /// `repo` is `None` when the store was unreachable at startup.
    pub fn new(repo: Option<TaskRepository>, web_app_url: Option<String>) -> Self {
        Self { repo, web_app_url }
    }

    pub async fn handle(&self, incoming: &Incoming) -> Reply {
        let sender = &incoming.sender;

        let result = match &incoming.content {
            Content::Text(text) => match Command::parse(text) {
                Some(command) => self.run(command, sender).await,
                None if text.trim_start().starts_with('{') => {
                    webapp::handle_payload(self, sender, text).await
                }
                None => Ok(Reply::text(reply::unknown_command())),
            },
            Content::WebAppData(data) => webapp::handle_payload(self, sender, data).await,
        };

        result.unwrap_or_else(|e| {
            tracing::debug!("Command from {} failed: {}", sender.id, e);
            e.into_reply()
        })
    }

    async fn run(&self, command: Command, sender: &Sender) -> Result<Reply, CommandError> {
        tracing::debug!("{:?} from {}", command, sender.id);

        match command {
            Command::Start => users::start(self, sender).await,
            Command::Status => users::status(self, sender).await,
            Command::Url => Ok(users::url(self)),
            Command::MyProjects => projects::my_projects(self.repo()?, sender).await,
            Command::CreateProject(args) => projects::create_project(self, sender, &args).await,
            Command::MyTasks => tasks::my_tasks(self.repo()?, sender).await,
            Command::CreateTask(args) => tasks::create_task(self.repo()?, sender, &args).await,
            Command::Comments(args) => tasks::comments(self.repo()?, sender, &args).await,
        }
    }

    /// Data commands need a store; in degraded mode there is none.
    fn repo(&self) -> Result<&TaskRepository, CommandError> {
        self.repo.as_ref().ok_or(CommandError::Unavailable)
    }

    fn web_app_url(&self) -> Option<&str> {
        self.web_app_url.as_deref()
    }
}
