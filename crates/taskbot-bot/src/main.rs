use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use taskbot_store::{Backend, MemoryBackend, RestBackend, TaskRepository};
use teloxide::Bot;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod handlers;
mod reply;
mod routes;
mod telegram;
mod tunnel;

use config::{Config, StoreSettings};
use handlers::CommandDispatcher;
use tunnel::Tunnel;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskbot=debug,taskbot_store=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let repo = connect_store(&config).await?;

    // Mini app server
    let app = routes::create_router(&config.webapp_dir);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.webapp_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind mini app server to {}", addr))?;
    tracing::info!("Mini app server listening on {}", addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Mini app server stopped: {}", e);
        }
    });

    let mut tunnel = None;
    let web_app_url = match (&config.webapp_url, &config.tunnel_command) {
        (Some(url), _) => Some(url.clone()),
        (None, Some(command)) => {
            match Tunnel::open(command, config.webapp_port, config.tunnel_timeout).await {
                Ok(opened) => {
                    let url = opened.url().to_string();
                    tunnel = Some(opened);
                    Some(url)
                }
                Err(e) => {
                    tracing::error!("Tunnel unavailable, mini app disabled: {:#}", e);
                    None
                }
            }
        }
        (None, None) => None,
    };

    let bot = Bot::new(config.bot_token.clone());
    telegram::configure(&bot, web_app_url.as_deref()).await;

    let dispatcher = Arc::new(CommandDispatcher::new(repo, web_app_url));
    tracing::info!("Task Tracker Bot started");
    telegram::run(bot, dispatcher).await;

    if let Some(tunnel) = tunnel {
        tunnel.close().await;
    }
    tracing::info!("Task Tracker Bot stopped");

    Ok(())
}

/// `None` when the store fails its startup health check; the bot then runs
/// in degraded mode.
async fn connect_store(config: &Config) -> anyhow::Result<Option<TaskRepository>> {
    let backend: Arc<dyn Backend> = match &config.store {
        StoreSettings::Rest { url, key } => Arc::new(
            RestBackend::new(url, key, config.store_timeout)
                .context("Failed to build store client")?,
        ),
        StoreSettings::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Arc::new(MemoryBackend::new())
        }
    };

    let repo = TaskRepository::new(backend).with_memberships(config.include_memberships);

    if repo.health_check().await {
        tracing::info!(
            "Store connected ({}, memberships {})",
            repo.backend_name(),
            if repo.include_memberships() { "on" } else { "off" }
        );
        Ok(Some(repo))
    } else {
        tracing::error!("Store unavailable at startup, running in degraded mode");
        Ok(None)
    }
}
