//! HTTP error response handling for the API
//!
//! Domain errors become `{"error": "<fixed message>"}` with the mapped status.
//! The detailed `Display` text is logged here and never sent to the client.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::warn!(code = self.error_code(), error = %self, "request rejected");
        }

        let api_error: ApiError = self.into();
        (status_code, Json(api_error)).into_response()
    }
}

/// Implement IntoResponse for ApiError for explicit error responses
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Errors normally go through Error::into_response, which knows the status
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractError, ResolveError};
    use crate::types::{TaskId, TaskStatus};
    use std::time::Duration;

    async fn render(error: Error) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_renders_fixed_body() {
        let (status, body) = render(Error::NotFound("abc".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({"error": "not found"}));
    }

    #[tokio::test]
    async fn test_state_conflict_is_bad_request() {
        let (status, body) = render(Error::StateConflict {
            id: TaskId::new(),
            status: TaskStatus::Downloading,
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "not completed");
    }

    #[tokio::test]
    async fn test_resolve_errors_map_to_gateway_statuses() {
        let (status, _) = render(ResolveError::Timeout(Duration::from_secs(8)).into()).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);

        let (status, body) = render(
            ResolveError::ExtractionFailed(ExtractError::Failed(
                "ERROR: /home/app/.cache/yt-dlp exploded".into(),
            ))
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!body["error"].as_str().unwrap().contains("/home/app"));

        let (status, _) = render(ResolveError::NoStreamFound.into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_io_error_hides_path() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "/srv/downloads_v2/x");
        let (status, body) = render(Error::Io(io)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
    }

    #[tokio::test]
    async fn test_api_error_defaults_to_internal_server_error() {
        let response = ApiError::new("boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
