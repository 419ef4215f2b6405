//! Error types for media-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (resolution, extraction, task state)
//! - HTTP status code mapping for API integration
//! - Fixed, generic client messages per error category
//!
//! Collaborator detail (stderr, paths, parser errors) lives in the `Display`
//! output and is only ever logged. Clients see [`Error::client_message`].

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{TaskId, TaskStatus};

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Client message for a request without a usable `url` field
pub const MSG_URL_REQUIRED: &str = "url is required";
/// Client message for a URL outside the source allow-list
pub const MSG_INVALID_SOURCE: &str = "invalid source url";
/// Client message for a direct resolution that hit its deadline
pub const MSG_PREPARATION_TIMED_OUT: &str = "preparation timed out";
/// Client message for a direct resolution the collaborator failed
pub const MSG_PREPARATION_FAILED: &str =
    "could not prepare browser download — try again or use the local command";
/// Client message when no direct stream can be offered
pub const MSG_NO_DIRECT_STREAM: &str = "no direct downloadable stream found";
/// Error text recorded on a failed task
pub const MSG_DOWNLOAD_FAILED: &str =
    "download failed on server — try again or use the local command";
/// Client message for unknown task ids
pub const MSG_NOT_FOUND: &str = "not found";
/// Client message for a file requested before its task completed
pub const MSG_NOT_COMPLETED: &str = "not completed";
/// Client message for a completed task whose file is gone from disk
pub const MSG_FILE_MISSING: &str = "file missing";

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "MEDIA_DL_BIND")
        key: Option<String>,
    },

    /// Request validation failed (missing or rejected source URL)
    ///
    /// The message is one of the fixed client strings and is safe to return.
    #[error("validation error: {0}")]
    Validation(&'static str),

    /// Task not found
    #[error("task not found: {0}")]
    NotFound(String),

    /// The task exists but is not in a state that allows the operation
    #[error("task {id} is {status}, not completed")]
    StateConflict {
        /// Task that was asked for its file
        id: TaskId,
        /// Status at the time of the request
        status: TaskStatus,
    },

    /// The task completed but its file has been removed from disk
    #[error("file for task {id} is missing from disk")]
    FileMissing {
        /// Task whose file is missing
        id: TaskId,
    },

    /// Direct-mode resolution failed
    #[error("direct resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// Extraction collaborator failed
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Tunnel could not be established
    #[error("tunnel error: {0}")]
    Tunnel(String),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,
}

/// Failures of the bounded direct-resolution path
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The collaborator did not answer before the deadline
    #[error("resolution did not finish within {0:?}")]
    Timeout(Duration),

    /// The collaborator raised an error
    #[error("collaborator failed: {0}")]
    ExtractionFailed(#[source] ExtractError),

    /// Live streams have no static direct URL
    #[error("source is a live stream")]
    NotApplicable,

    /// Neither a format candidate nor a top-level URL was usable
    #[error("no usable stream url in descriptor")]
    NoStreamFound,
}

/// Errors reported by an [`Extractor`](crate::extractor::Extractor)
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The collaborator gave up waiting on the remote side
    #[error("collaborator timed out: {0}")]
    Timeout(String),

    /// The collaborator binary or the requested media could not be found
    #[error("not found: {0}")]
    NotFound(String),

    /// The collaborator answered with output that could not be understood
    #[error("malformed collaborator response: {0}")]
    MalformedResponse(String),

    /// Any other collaborator failure (non-zero exit, unsupported URL, ...)
    #[error("{0}")]
    Failed(String),

    /// I/O error while talking to the collaborator
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// API error response format
///
/// Every error answered by the HTTP facade has this shape:
///
/// ```json
/// { "error": "not found" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Fixed, human-readable error message
    pub error: String,
}

impl ApiError {
    /// Create a new API error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Convert errors to HTTP status codes for API responses
///
/// This trait maps domain errors to appropriate HTTP status codes.
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::Validation(_) => 400,
            Error::Config { .. } => 400,
            Error::StateConflict { .. } => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::FileMissing { .. } => 404,

            // Direct resolution taxonomy
            Error::Resolve(ResolveError::Timeout(_)) => 504,
            Error::Resolve(ResolveError::ExtractionFailed(_)) => 502,
            Error::Resolve(ResolveError::NotApplicable) => 422,
            Error::Resolve(ResolveError::NoStreamFound) => 422,

            // 502 Bad Gateway - collaborator and upstream failures
            Error::Extract(_) => 502,
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Tunnel(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::StateConflict { .. } => "state_conflict",
            Error::FileMissing { .. } => "file_missing",
            Error::Resolve(e) => match e {
                ResolveError::Timeout(_) => "timeout",
                ResolveError::ExtractionFailed(_) => "extraction_failed",
                ResolveError::NotApplicable => "not_applicable",
                ResolveError::NoStreamFound => "no_stream_found",
            },
            Error::Extract(_) => "extraction_failed",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Network(_) => "network_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Tunnel(_) => "tunnel_error",
            Error::ShuttingDown => "shutting_down",
        }
    }
}

impl Error {
    /// The fixed message a client is allowed to see for this error
    pub fn client_message(&self) -> &'static str {
        match self {
            Error::Validation(message) => *message,
            Error::NotFound(_) => MSG_NOT_FOUND,
            Error::StateConflict { .. } => MSG_NOT_COMPLETED,
            Error::FileMissing { .. } => MSG_FILE_MISSING,
            Error::Resolve(ResolveError::Timeout(_)) => MSG_PREPARATION_TIMED_OUT,
            Error::Resolve(ResolveError::ExtractionFailed(_)) => MSG_PREPARATION_FAILED,
            Error::Resolve(ResolveError::NotApplicable | ResolveError::NoStreamFound) => {
                MSG_NO_DIRECT_STREAM
            }
            Error::Extract(_) => MSG_DOWNLOAD_FAILED,
            Error::ShuttingDown => "server is shutting down",
            Error::Config { .. } => "invalid configuration",
            Error::Io(_)
            | Error::Serialization(_)
            | Error::Network(_)
            | Error::ApiServerError(_)
            | Error::Tunnel(_) => "internal server error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError::new(error.client_message())
    }
}
