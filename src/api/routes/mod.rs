//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] - Job submission, status and file retrieval, output cleanup
//! - [`system`] - Health, events, OpenAPI

use crate::types::TaskId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod jobs;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use jobs::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// How a submitted URL is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobMode {
    /// Download on the server in the background (default)
    #[default]
    Async,
    /// Resolve a direct stream URL for the browser; nothing is stored
    Direct,
}

/// Request body for POST /jobs
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateJobRequest {
    /// Source page URL
    pub url: Option<String>,
    /// `"direct"` for direct mode; anything else starts a background job
    #[serde(default)]
    pub mode: JobMode,
}

impl CreateJobRequest {
    /// Read a request leniently
    ///
    /// A body that is not a JSON object, or whose `url` is not a string, yields
    /// no url. Unknown `mode` values fall back to [`JobMode::Async`].
    pub fn from_body(body: &[u8]) -> Self {
        let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(body) else {
            return Self::default();
        };
        let url = fields.get("url").and_then(Value::as_str).map(str::to_string);
        let mode = match fields.get("mode").and_then(Value::as_str) {
            Some("direct") => JobMode::Direct,
            _ => JobMode::Async,
        };
        Self { url, mode }
    }
}

/// Response body for an accepted background job
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateJobResponse {
    /// Id to poll with GET /jobs/:id
    pub task_id: TaskId,
}

/// Response body for a resolved direct URL
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DirectUrlResponse {
    /// Streamable media URL
    pub direct_url: String,
}

/// Response body for POST /cleanup
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CleanupResponse {
    /// Number of files removed
    pub removed: usize,
}

/// Response body for GET /health
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// Always `true` while the server answers
    pub ok: bool,
}
