//! Job handlers: submission, status, file retrieval and cleanup.

use super::{CleanupResponse, CreateJobRequest, CreateJobResponse, DirectUrlResponse, JobMode};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::types::{TaskId, TaskInfo};
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// POST /jobs - Start a background job or resolve a direct URL
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 200, description = "Job accepted; direct mode answers with DirectUrlResponse instead", body = CreateJobResponse),
        (status = 400, description = "Missing or disallowed url", body = crate::error::ApiError),
        (status = 422, description = "No direct stream available", body = crate::error::ApiError),
        (status = 502, description = "Direct resolution failed", body = crate::error::ApiError),
        (status = 503, description = "Server is shutting down", body = crate::error::ApiError),
        (status = 504, description = "Direct resolution timed out", body = crate::error::ApiError)
    )
)]
pub async fn create_job(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let request = CreateJobRequest::from_body(&body);
    let url = state.downloader.validate_source(request.url.as_deref())?;

    match request.mode {
        JobMode::Direct => {
            let direct_url = state.downloader.resolve_direct(url).await?;
            Ok((StatusCode::OK, Json(DirectUrlResponse { direct_url })).into_response())
        }
        JobMode::Async => {
            let task_id = state.downloader.submit(url)?;
            Ok((StatusCode::OK, Json(CreateJobResponse { task_id })).into_response())
        }
    }
}

/// GET /jobs/:id - Task status
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task status", body = TaskInfo),
        (status = 404, description = "Unknown task", body = crate::error::ApiError)
    )
)]
pub async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<TaskInfo>> {
    let id = parse_task_id(&id)?;
    Ok(Json(state.downloader.task_info(id)?))
}

/// GET /jobs/:id/file - Download a completed task's file
#[utoipa::path(
    get,
    path = "/jobs/{id}/file",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 400, description = "Task has not completed", body = crate::error::ApiError),
        (status = 404, description = "Unknown task or file missing", body = crate::error::ApiError)
    )
)]
pub async fn get_job_file(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let id = parse_task_id(&id)?;
    let (path, filename) = state.downloader.task_file(id).await?;

    // The sweeper may remove the file between the check and the open
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| Error::FileMissing { id })?;
    let length = file.metadata().await?.len();

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(&filename))
            .map_err(|e| Error::ApiServerError(format!("content-disposition header: {e}")))?,
    );

    tracing::info!(task_id = %id, filename = %filename, bytes = length, "serving file");
    Ok(response)
}

/// POST /cleanup - Delete output files past retention
#[utoipa::path(
    post,
    path = "/cleanup",
    tag = "jobs",
    responses(
        (status = 200, description = "Number of files removed", body = CleanupResponse),
        (status = 500, description = "Output directory could not be read", body = crate::error::ApiError)
    )
)]
pub async fn cleanup(State(state): State<AppState>) -> Result<Json<CleanupResponse>> {
    let removed = state.downloader.cleanup().await?;
    Ok(Json(CleanupResponse { removed }))
}

/// Unparseable ids are answered like unknown ones
fn parse_task_id(raw: &str) -> Result<TaskId> {
    raw.parse().map_err(|_| Error::NotFound(raw.to_string()))
}

/// `attachment` disposition with an ASCII fallback name and the exact UTF-8 name
pub(crate) fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii_name() {
        assert_eq!(
            content_disposition("abc_clip.mp4"),
            "attachment; filename=\"abc_clip.mp4\"; filename*=UTF-8''abc_clip.mp4"
        );
    }

    #[test]
    fn test_content_disposition_unicode_name() {
        let value = content_disposition("id_花园 \"散步\".mp4");
        assert!(value.starts_with("attachment; filename=\"id___ ____.mp4\";"));
        assert!(value.contains("filename*=UTF-8''id_%E8%8A%B1%E5%9B%AD%20%22%E6%95%A3%E6%AD%A5%22.mp4"));
        assert!(HeaderValue::from_str(&value).is_ok());
    }

    #[test]
    fn test_parse_task_id_garbage_is_not_found() {
        assert!(matches!(parse_task_id("not-a-uuid"), Err(Error::NotFound(_))));
        let id = TaskId::new();
        assert_eq!(parse_task_id(&id.to_string()).unwrap(), id);
    }
}
