use taskbot_shared::api::NewUser;

use super::{CommandDispatcher, Sender};
use crate::error::{CommandError, OrFail};
use crate::reply::{self, Reply};

/// /start
pub async fn start(dispatcher: &CommandDispatcher, sender: &Sender) -> Result<Reply, CommandError> {
    let repo = dispatcher.repo()?;

    let user = NewUser::new(sender.id, sender.username.clone(), sender.full_name());
    repo.upsert_user(user).await.or_fail(reply::REGISTER_FAILED)?;
    tracing::info!("User registered: {} - {}", sender.id, sender.full_name());

    let reply = match dispatcher.web_app_url() {
        Some(url) => Reply::text(format!("{}{}", reply::WELCOME, reply::WELCOME_WEB_APP))
            .with_web_app(reply::OPEN_BUTTON, reply::mini_app_url(url)),
        None => Reply::text(reply::WELCOME),
    };

    Ok(reply)
}

/// /status
pub async fn status(dispatcher: &CommandDispatcher, sender: &Sender) -> Result<Reply, CommandError> {
    let connected = match &dispatcher.repo {
        Some(repo) => repo.health_check().await,
        None => false,
    };

    Ok(Reply::text(reply::status(
        connected,
        sender.id,
        dispatcher.web_app_url(),
    )))
}

/// /url
pub fn url(dispatcher: &CommandDispatcher) -> Reply {
    match dispatcher.web_app_url() {
        Some(url) => Reply::text(format!(
            "🌐 Task Tracker URL: {}",
            reply::mini_app_url(url)
        )),
        None => Reply::text(reply::NO_WEB_APP_URL),
    }
}
