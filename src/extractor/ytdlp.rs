//! Extractor backed by an external yt-dlp binary

use super::{Extractor, ProgressCallback};
use crate::config::Config;
use crate::error::ExtractError;
use crate::types::{MediaDescriptor, OutputTemplate, ProgressEvent, SavedMedia};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Prefix of the progress lines requested with `--progress-template`
const PROGRESS_PREFIX: &str = "[progress]";
/// Prefix of the line printed once the final file is in place
const SAVED_PREFIX: &str = "[saved]";

/// Extractor that runs the `yt-dlp` binary
///
/// Metadata comes from `--dump-single-json`. Downloads print one progress
/// line per update (`--newline --progress-template`) and a final JSON line
/// with the saved path and title (`--print after_move:`).
///
/// # Examples
///
/// ```no_run
/// use media_dl::extractor::YtDlpExtractor;
/// use std::path::PathBuf;
///
/// // Explicit binary
/// let extractor = YtDlpExtractor::new(PathBuf::from("/usr/local/bin/yt-dlp"), "best", vec![]);
///
/// // Or auto-discover from PATH
/// let extractor = YtDlpExtractor::from_path("best", vec![]).expect("yt-dlp not found in PATH");
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    binary_path: PathBuf,
    format: String,
    extra_args: Vec<String>,
}

impl YtDlpExtractor {
    /// Create an extractor with an explicit binary path
    pub fn new(binary_path: PathBuf, format: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self {
            binary_path,
            format: format.into(),
            extra_args,
        }
    }

    /// Path of the binary this extractor runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Find `yt-dlp` on PATH
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::NotFound`] if no binary is on PATH.
    pub fn from_path(
        format: impl Into<String>,
        extra_args: Vec<String>,
    ) -> Result<Self, ExtractError> {
        let binary = which::which("yt-dlp")
            .map_err(|e| ExtractError::NotFound(format!("yt-dlp binary: {e}")))?;
        Ok(Self::new(binary, format, extra_args))
    }

    /// Build from configuration, falling back to PATH discovery
    pub fn from_config(config: &Config) -> Result<Self, ExtractError> {
        let format = config.download.format.clone();
        let extra_args = config.extractor.extra_args.clone();
        match &config.extractor.ytdlp_path {
            Some(path) => Ok(Self::new(path.clone(), format, extra_args)),
            None => Self::from_path(format, extra_args),
        }
    }

    fn resolve_args(&self, url: &str) -> Vec<String> {
        let mut args: Vec<String> = [
            "--dump-single-json",
            "--no-playlist",
            "--no-warnings",
            "--quiet",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.extend(self.extra_args.iter().cloned());
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    fn download_args(&self, url: &str, template: &OutputTemplate) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            self.format.clone(),
            "-o".to_string(),
            template.to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--quiet".to_string(),
            "--progress".to_string(),
            "--newline".to_string(),
            "--progress-template".to_string(),
            format!(
                "download:{PROGRESS_PREFIX} %(progress.status)s %(progress.downloaded_bytes)s \
                 %(progress.total_bytes)s %(progress.total_bytes_estimate)s"
            ),
            "--print".to_string(),
            format!("after_move:{SAVED_PREFIX} %(.{{filepath,title}})j"),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    fn spawn_error(&self, e: std::io::Error) -> ExtractError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExtractError::NotFound(format!(
                "yt-dlp binary {}: {e}",
                self.binary_path.display()
            ))
        } else {
            ExtractError::Io(e)
        }
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    async fn resolve(&self, url: &str) -> Result<MediaDescriptor, ExtractError> {
        let output = Command::new(&self.binary_path)
            .args(self.resolve_args(url))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(classify_failure(
                &String::from_utf8_lossy(&output.stderr),
                output.status,
            ));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ExtractError::MalformedResponse(format!("info json: {e}")))
    }

    async fn extract_and_save(
        &self,
        url: &str,
        template: &OutputTemplate,
        progress: ProgressCallback,
    ) -> Result<SavedMedia, ExtractError> {
        let mut child = Command::new(&self.binary_path)
            .args(self.download_args(url, template))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractError::Failed("yt-dlp stdout not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExtractError::Failed("yt-dlp stderr not captured".to_string()))?;

        // Drain stderr concurrently so a chatty child never blocks on a full pipe
        let stderr_reader = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut saved = None;
        while let Some(line) = lines.next_line().await? {
            if let Some(event) = parse_progress_line(&line) {
                progress(event);
            } else if let Some(line_saved) = parse_saved_line(&line) {
                saved = Some(line_saved);
            } else if !line.trim().is_empty() {
                tracing::debug!(line = %line, "unrecognized yt-dlp output");
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_reader.await.unwrap_or_default();

        if !status.success() {
            return Err(classify_failure(&stderr, status));
        }

        saved.ok_or_else(|| {
            ExtractError::MalformedResponse("yt-dlp exited without reporting a saved file".into())
        })
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Parse `[progress] <status> <downloaded> <total> <estimate>`; `NA` marks a missing value
fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.split_whitespace();
    let status = fields.next()?.to_string();
    let mut next_number = || fields.next().and_then(parse_byte_count);

    Some(ProgressEvent {
        status,
        downloaded_bytes: next_number(),
        total_bytes: next_number(),
        total_bytes_estimate: next_number(),
    })
}

/// Byte counts come out as integers, or as floats for estimates
fn parse_byte_count(field: &str) -> Option<u64> {
    if let Ok(n) = field.parse::<u64>() {
        return Some(n);
    }
    field
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u64)
}

#[derive(Deserialize)]
struct SavedLine {
    filepath: Option<String>,
    title: Option<String>,
}

fn parse_saved_line(line: &str) -> Option<SavedMedia> {
    let json = line.trim().strip_prefix(SAVED_PREFIX)?;
    let saved: SavedLine = serde_json::from_str(json.trim()).ok()?;
    Some(SavedMedia {
        filepath: PathBuf::from(saved.filepath?),
        title: saved.title,
    })
}

/// Map a non-zero exit to the typed error channel
fn classify_failure(stderr: &str, status: std::process::ExitStatus) -> ExtractError {
    let message = stderr
        .lines()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| stderr.lines().rev().find(|l| !l.trim().is_empty()))
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| format!("yt-dlp exited with {status}"));

    let lower = message.to_lowercase();
    if lower.contains("timed out") {
        ExtractError::Timeout(message)
    } else if lower.contains("http error 404") || lower.contains("unsupported url") {
        ExtractError::NotFound(message)
    } else {
        ExtractError::Failed(message)
    }
}
