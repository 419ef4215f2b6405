//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a download task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Allocate a fresh random TaskId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Task status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Accepted and waiting for its worker to start
    Queued,
    /// Worker is running the extraction
    Downloading,
    /// File saved (terminal)
    Completed,
    /// Extraction failed (terminal)
    Failed,
}

impl TaskStatus {
    /// Whether no further transitions can occur
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Whether `self -> next` is an edge of `queued -> downloading -> {completed|failed}`
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Queued, TaskStatus::Downloading)
                | (TaskStatus::Downloading, TaskStatus::Completed)
                | (TaskStatus::Downloading, TaskStatus::Failed)
        )
    }

    /// Lowercase name as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One asynchronous download request and its progress/result record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier
    pub id: TaskId,
    /// Current lifecycle status
    pub status: TaskStatus,
    /// Progress percentage (0 to 100)
    pub progress: u8,
    /// Source URL
    pub url: String,
    /// When the task was submitted
    pub created: DateTime<Utc>,
    /// Saved file name (set on completion)
    pub filename: Option<String>,
    /// Saved file path (set on completion, never sent to clients)
    pub filepath: Option<PathBuf>,
    /// Media title reported by the collaborator (set on completion)
    pub title: Option<String>,
    /// Generic failure message (set on failure)
    pub error: Option<String>,
}

impl Task {
    /// Create a queued task with a fresh id
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            status: TaskStatus::Queued,
            progress: 0,
            url: url.into(),
            created: Utc::now(),
            filename: None,
            filepath: None,
            title: None,
            error: None,
        }
    }
}

/// Client-facing projection of a [`Task`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskInfo {
    /// Current lifecycle status
    pub status: TaskStatus,
    /// Progress percentage (0 to 100)
    pub progress: u8,
    /// Saved file name, once completed
    pub filename: Option<String>,
    /// Media title, once completed
    pub title: Option<String>,
    /// Generic failure message, only present for failed tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Task> for TaskInfo {
    fn from(task: &Task) -> Self {
        Self {
            status: task.status,
            progress: task.progress,
            filename: task.filename.clone(),
            title: task.title.clone(),
            error: if task.status == TaskStatus::Failed {
                task.error.clone()
            } else {
                None
            },
        }
    }
}

/// Raw progress callback payload from the extraction collaborator
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Collaborator-defined phase ("downloading", "finished", ...)
    pub status: String,
    /// Bytes downloaded so far
    #[serde(default)]
    pub downloaded_bytes: Option<u64>,
    /// Exact total size, when known
    #[serde(default)]
    pub total_bytes: Option<u64>,
    /// Estimated total size, when the exact one is unknown
    #[serde(default)]
    pub total_bytes_estimate: Option<u64>,
}

impl ProgressEvent {
    /// A "downloading" event with the given counters
    pub fn downloading(downloaded: u64, total: Option<u64>, estimate: Option<u64>) -> Self {
        Self {
            status: "downloading".to_string(),
            downloaded_bytes: Some(downloaded),
            total_bytes: total,
            total_bytes_estimate: estimate,
        }
    }

    /// Best known total: the exact total if non-zero, else the estimate
    pub fn total(&self) -> Option<u64> {
        self.total_bytes
            .filter(|t| *t > 0)
            .or(self.total_bytes_estimate)
            .filter(|t| *t > 0)
    }
}

/// Media metadata returned by a metadata-only resolution
///
/// Deserializes directly from the collaborator's JSON info document; unknown
/// fields are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaDescriptor {
    /// Media title
    pub title: Option<String>,
    /// Whether the source is a live stream (`null` in some info documents)
    pub is_live: Option<bool>,
    /// Formats the collaborator would pick for a download
    pub requested_formats: Option<Vec<FormatCandidate>>,
    /// Every format the source offers
    pub formats: Option<Vec<FormatCandidate>>,
    /// Top-level URL for single-format sources
    pub url: Option<String>,
}

impl MediaDescriptor {
    /// Whether the descriptor is marked live
    pub fn is_live(&self) -> bool {
        self.is_live.unwrap_or(false)
    }

    /// The candidate set: requested formats if any, otherwise all formats
    pub fn candidates(&self) -> Option<&[FormatCandidate]> {
        [&self.requested_formats, &self.formats]
            .into_iter()
            .flatten()
            .find(|formats| !formats.is_empty())
            .map(Vec::as_slice)
    }
}

/// One candidate format of a [`MediaDescriptor`]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatCandidate {
    /// Video height in pixels
    #[serde(deserialize_with = "lenient::unsigned")]
    pub height: Option<u32>,
    /// Total bitrate in kbit/s
    #[serde(alias = "tbr", deserialize_with = "lenient::float")]
    pub bitrate: Option<f64>,
    /// File size in bytes
    #[serde(deserialize_with = "lenient::unsigned")]
    pub filesize: Option<u64>,
    /// Direct media URL
    pub url: Option<String>,
}

/// Numeric fields of collaborator JSON
///
/// Info documents mix integers, floats, `null` and the occasional string for
/// the same field. Any JSON number is accepted; everything else reads as `None`.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_f64().filter(|n| n.is_finite()))
    }

    pub(super) fn float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        number(deserializer)
    }

    pub(super) fn unsigned<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<u64>,
    {
        Ok(number(deserializer)?
            .filter(|n| *n >= 0.0)
            .and_then(|n| T::try_from(n as u64).ok()))
    }
}

/// Result of a successful `extract_and_save`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedMedia {
    /// Where the file was written
    pub filepath: PathBuf,
    /// Media title, if the collaborator reported one
    pub title: Option<String>,
}

impl SavedMedia {
    /// File name component of the saved path
    pub fn filename(&self) -> String {
        self.filepath
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Destination template handed to the collaborator
///
/// Uses the collaborator's `%(field)s` placeholders; the task id prefix keeps
/// concurrently running tasks from writing to the same file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputTemplate(String);

impl OutputTemplate {
    /// `<output_dir>/<task_id>_%(title)s.%(ext)s`
    pub fn for_task(output_dir: &Path, id: TaskId) -> Self {
        let template = output_dir.join(format!("{id}_%(title)s.%(ext)s"));
        Self(template.to_string_lossy().into_owned())
    }

    /// Template text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OutputTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Event emitted during the task lifecycle
///
/// Failure detail is never carried on the bus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task accepted
    Queued {
        /// Task ID
        id: TaskId,
        /// Source URL
        url: String,
    },

    /// Worker started the extraction
    Downloading {
        /// Task ID
        id: TaskId,
    },

    /// Recorded progress changed
    Progress {
        /// Task ID
        id: TaskId,
        /// Progress percentage (0 to 100)
        percent: u8,
    },

    /// File saved
    Completed {
        /// Task ID
        id: TaskId,
        /// Saved file name
        filename: String,
    },

    /// Extraction failed
    Failed {
        /// Task ID
        id: TaskId,
    },

    /// Downloader is shutting down
    Shutdown,
}

impl Event {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            Event::Queued { .. } => "queued",
            Event::Downloading { .. } => "downloading",
            Event::Progress { .. } => "progress",
            Event::Completed { .. } => "completed",
            Event::Failed { .. } => "failed",
            Event::Shutdown => "shutdown",
        }
    }
}
