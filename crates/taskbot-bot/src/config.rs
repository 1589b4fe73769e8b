use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

/// Where task data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSettings {
    Rest { url: String, key: String },
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub store: StoreSettings,
    pub store_timeout: Duration,
    pub include_memberships: bool,
    pub webapp_port: u16,
    pub webapp_dir: PathBuf,
    pub webapp_url: Option<String>,
    pub tunnel_command: Option<String>,
    pub tunnel_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bot_token = get("BOT_TOKEN").context("BOT_TOKEN must be set")?;

        let store = match get("STORE_BACKEND").as_deref().unwrap_or("rest") {
            "rest" => StoreSettings::Rest {
                url: get("SUPABASE_URL").context("SUPABASE_URL must be set")?,
                key: get("SUPABASE_KEY").context("SUPABASE_KEY must be set")?,
            },
            "memory" => StoreSettings::Memory,
            other => bail!("STORE_BACKEND must be 'rest' or 'memory', got '{}'", other),
        };

        Ok(Self {
            bot_token,
            store,
            store_timeout: Duration::from_secs(parse_or(&get, "STORE_TIMEOUT_SECS", 5)?),
            include_memberships: parse_flag(&get, "INCLUDE_MEMBERSHIPS")?,
            webapp_port: parse_or(&get, "WEBAPP_PORT", 8080)?,
            webapp_dir: get("WEBAPP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("webapp")),
            webapp_url: get("WEBAPP_URL").map(|url| url.trim_end_matches('/').to_string()),
            tunnel_command: get("TUNNEL_COMMAND"),
            tunnel_timeout: Duration::from_secs(parse_or(&get, "TUNNEL_TIMEOUT_SECS", 30)?),
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(name) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", name, raw)),
        None => Ok(default),
    }
}

fn parse_flag(get: &impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<bool> {
    match get(name).map(|raw| raw.to_ascii_lowercase()).as_deref() {
        None | Some("0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => bail!("{} must be a boolean, got '{}'", name, other),
    }
}
