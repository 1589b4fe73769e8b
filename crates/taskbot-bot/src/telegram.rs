//! Telegram transport: long polling in, one reply per message out.

use std::sync::Arc;

use reqwest::Url;
use teloxide::{
    payloads::{SendMessageSetters, SetChatMenuButtonSetters},
    prelude::*,
    types::{BotCommand, ButtonRequest, KeyboardButton, KeyboardMarkup, MenuButton, WebAppInfo},
    RequestError,
};

use crate::handlers::{CommandDispatcher, Content, Incoming, Sender};
use crate::reply::{self, Reply, WebAppButton};

/// Register the command list and, when the mini app is reachable, the menu button.
pub async fn configure(bot: &Bot, web_app_url: Option<&str>) {
    let commands: Vec<BotCommand> = reply::COMMANDS
        .iter()
        .map(|(command, description)| BotCommand::new(*command, *description))
        .collect();

    if let Err(e) = bot.set_my_commands(commands).await {
        tracing::warn!("Failed to register bot commands: {}", e);
    }

    let Some(url) = web_app_url.and_then(|base| parse_url(&reply::mini_app_url(base))) else {
        return;
    };

    let menu = MenuButton::WebApp {
        text: reply::MENU_BUTTON.to_string(),
        web_app: WebAppInfo { url: url.clone() },
    };
    match bot.set_chat_menu_button().menu_button(menu).await {
        Ok(_) => tracing::info!("Bot menu configured with URL: {}", url),
        Err(e) => tracing::warn!("Failed to set menu button: {}", e),
    }
}

/// Poll for updates until Ctrl-C.
pub async fn run(bot: Bot, dispatcher: Arc<CommandDispatcher>) {
    let handler = Update::filter_message().endpoint(on_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn on_message(
    bot: Bot,
    msg: Message,
    dispatcher: Arc<CommandDispatcher>,
) -> ResponseResult<()> {
    let Some(incoming) = to_incoming(&msg) else {
        return Ok(());
    };

    let reply = dispatcher.handle(&incoming).await;

    if let Err(e) = send_reply(&bot, msg.chat.id, reply).await {
        tracing::error!("Failed to reply in chat {}: {}", msg.chat.id, e);
    }

    Ok(())
}

/// Messages without a sender or without text/mini app data are ignored.
fn to_incoming(msg: &Message) -> Option<Incoming> {
    let user = msg.from()?;

    let content = match (msg.web_app_data(), msg.text()) {
        (Some(data), _) => Content::WebAppData(data.data.clone()),
        (None, Some(text)) => Content::Text(text.to_string()),
        (None, None) => return None,
    };

    Some(Incoming {
        sender: Sender {
            id: user.id.0 as i64,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        },
        content,
    })
}

async fn send_reply(bot: &Bot, chat_id: ChatId, reply: Reply) -> Result<(), RequestError> {
    let request = bot.send_message(chat_id, reply.text);

    match reply.web_app.as_ref().and_then(keyboard) {
        Some(markup) => request.reply_markup(markup).await?,
        None => request.await?,
    };

    Ok(())
}

fn keyboard(button: &WebAppButton) -> Option<KeyboardMarkup> {
    let url = parse_url(&button.url)?;
    let button = KeyboardButton::new(button.text.clone())
        .request(ButtonRequest::WebApp(WebAppInfo { url }));

    Some(KeyboardMarkup::new(vec![vec![button]]))
}

fn parse_url(raw: &str) -> Option<Url> {
    Url::parse(raw)
        .map_err(|e| tracing::warn!("Invalid mini app URL '{}': {}", raw, e))
        .ok()
}
