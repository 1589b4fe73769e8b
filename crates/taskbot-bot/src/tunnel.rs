//! Public URL for the mini app via an external tunnel client (`tuna http <port>`).

use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{bail, Context};
use regex::Regex;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

fn url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"https?://[a-zA-Z0-9\-]+\.(ru\.)?tuna\.am").ok())
        .as_ref()
}

/// First tunnel URL in a line of client output, upgraded to https.
pub fn extract_url(line: &str) -> Option<String> {
    url_pattern()?
        .find(line)
        .map(|m| normalize(m.as_str()))
}

fn normalize(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => url.trim_end_matches('/').to_string(),
    }
}

/// `public_url` anywhere in the client's `list --json` output.
pub fn find_public_url(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map
            .get("public_url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(normalize)
            .or_else(|| map.values().find_map(find_public_url)),
        Value::Array(items) => items.iter().find_map(find_public_url),
        _ => None,
    }
}

/// A running tunnel client and the public URL it reported.
pub struct Tunnel {
    child: Child,
    url: String,
}

impl Tunnel {
    /// Run `<command> http <port>` and wait up to `timeout` for a URL on
    /// stdout or stderr. Falls back to `<command> list --json` once.
    pub async fn open(command: &str, port: u16, timeout: Duration) -> anyhow::Result<Self> {
        let (program, args) = split_command(command)?;

        let mut child = Command::new(program)
            .args(&args)
            .arg("http")
            .arg(port.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start tunnel command '{}'", command))?;
        tracing::info!("Tunnel client started: {} http {}", command, port);

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, tx);
        }

        let scanned = tokio::time::timeout(timeout, async {
            while let Some(line) = rx.recv().await {
                if let Some(url) = extract_url(&line) {
                    return Some(url);
                }
            }
            None
        })
        .await
        .ok()
        .flatten();

        let url = match scanned {
            Some(url) => Some(url),
            None => {
                tracing::warn!("No tunnel URL in client output, asking '{} list'", program);
                tokio::time::timeout(timeout, list_url(program, &args))
                    .await
                    .ok()
                    .flatten()
            }
        };

        match url {
            Some(url) => {
                tracing::info!("Tunnel URL: {}", url);
                Ok(Self { child, url })
            }
            None => {
                let _ = child.kill().await;
                bail!("Tunnel did not report a public URL within {:?}", timeout)
            }
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn close(mut self) {
        match self.child.kill().await {
            Ok(()) => tracing::info!("Tunnel client stopped"),
            Err(e) => tracing::warn!("Failed to stop tunnel client: {}", e),
        }
    }
}

fn split_command(command: &str) -> anyhow::Result<(&str, Vec<&str>)> {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("Tunnel command is empty");
    };
    Ok((program, parts.collect()))
}

/// Send every output line to `tx`; keeps draining after the receiver is gone.
fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!("tunnel: {}", line);
            let _ = tx.send(line);
        }
    });
}

async fn list_url(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .args(["list", "--json"])
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| tracing::warn!("'{} list' failed: {}", program, e))
        .ok()?;

    let value: Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| tracing::warn!("'{} list' printed invalid JSON: {}", program, e))
        .ok()?;

    find_public_url(&value)
}
