//! Optional public tunnel through an external ngrok binary
//!
//! The tunnel is best effort: callers log a failure and keep serving on the
//! local network. The auth token is handed to the child through its
//! environment and never appears in arguments or logs.

use crate::config::{TunnelConfig, env_keys};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

/// How many times the local inspection API is polled for the public URL
const API_POLL_ATTEMPTS: u32 = 40;
/// Delay between polls
const API_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A running tunnel; the ngrok process is killed when this is dropped
#[derive(Debug)]
pub struct Tunnel {
    child: Child,
    public_url: String,
}

impl Tunnel {
    /// Start `ngrok http <port>` and wait for its public URL
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tunnel`] if no ngrok binary is available, the process
    /// exits early, or no public URL shows up in time.
    pub async fn open(config: &TunnelConfig, port: u16) -> Result<Self> {
        let binary = match &config.ngrok_path {
            Some(path) => path.clone(),
            None => which::which("ngrok")
                .map_err(|e| Error::Tunnel(format!("ngrok binary not found: {e}")))?,
        };

        let mut child = spawn_ngrok(&binary, port, config.authtoken.as_deref())?;
        tracing::info!(binary = %binary.display(), port, "ngrok started");

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        for _ in 0..API_POLL_ATTEMPTS {
            if let Some(status) = child.try_wait()? {
                return Err(Error::Tunnel(format!("ngrok exited early with {status}")));
            }
            match fetch_public_url(&client, &config.api_url).await {
                Ok(Some(public_url)) => return Ok(Self { child, public_url }),
                Ok(None) => {}
                Err(e) => tracing::debug!(error = %e, "ngrok API not ready"),
            }
            tokio::time::sleep(API_POLL_INTERVAL).await;
        }

        child.kill().await.ok();
        Err(Error::Tunnel(
            "ngrok did not report a public url in time".to_string(),
        ))
    }

    /// Public URL clients can reach the server on
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    /// Stop the ngrok process
    pub async fn close(mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::warn!(error = %e, "failed to stop ngrok");
        }
    }
}

fn spawn_ngrok(binary: &PathBuf, port: u16, authtoken: Option<&str>) -> Result<Child> {
    let mut command = Command::new(binary);
    command
        .args(["http", &port.to_string(), "--log", "false"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    if let Some(token) = authtoken {
        command.env(env_keys::NGROK_AUTHTOKEN, token);
    }
    command
        .spawn()
        .map_err(|e| Error::Tunnel(format!("failed to start ngrok: {e}")))
}

#[derive(Deserialize)]
struct TunnelList {
    #[serde(default)]
    tunnels: Vec<TunnelEntry>,
}

#[derive(Deserialize)]
struct TunnelEntry {
    public_url: String,
    #[serde(default)]
    proto: String,
}

/// Ask the ngrok inspection API for the https public URL, if one is up yet
pub async fn fetch_public_url(client: &reqwest::Client, api_url: &str) -> Result<Option<String>> {
    let endpoint = format!("{}/api/tunnels", api_url.trim_end_matches('/'));
    let list: TunnelList = client
        .get(endpoint)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let https = list
        .tunnels
        .iter()
        .find(|t| t.proto == "https" || t.public_url.starts_with("https://"));
    Ok(https
        .or_else(|| list.tunnels.first())
        .map(|t| t.public_url.clone()))
}
