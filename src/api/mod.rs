//! REST API server module
//!
//! Exposes job submission, direct-URL resolution, status polling, file
//! retrieval and output cleanup over HTTP, plus an SSE event stream and the
//! OpenAPI document.

use crate::{Config, MediaDownloader, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Jobs
/// - `POST /jobs` - Start a background job, or resolve a direct URL with `mode: "direct"`
/// - `GET /jobs/:id` - Task status
/// - `GET /jobs/:id/file` - Download a completed task's file
///
/// ## Maintenance
/// - `POST /cleanup` - Delete output files past retention
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /events` - Server-sent events stream
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(downloader: Arc<MediaDownloader>, config: Arc<Config>) -> Router {
    let state = AppState::new(downloader, config.clone());

    let router = Router::new()
        // Jobs
        .route("/jobs", post(routes::create_job))
        .route("/jobs/:id", get(routes::get_job))
        .route("/jobs/:id/file", get(routes::get_job_file))
        // Maintenance
        .route("/cleanup", post(routes::cleanup))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    // Swagger UI serves its own copy of the document so it can't clash with /openapi.json
    let router = if config.server.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    if config.server.cors_enabled {
        router.layer(build_cors_layer(&config.server.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins that parse as header values are allowed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address
///
/// Runs until `shutdown` resolves, then drains in-flight requests and returns.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, MediaDownloader};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let downloader = Arc::new(MediaDownloader::new((*config).clone()).await?);
///
/// media_dl::api::start_api_server(downloader, config, media_dl::shutdown_signal()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server<F>(
    downloader: Arc<MediaDownloader>,
    config: Arc<Config>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.server.bind_address;
    tracing::info!(address = %bind_address, "Starting API server");

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    serve(listener, downloader, config, shutdown).await
}

/// Serve the API on an already bound listener
pub async fn serve<F>(
    listener: TcpListener,
    downloader: Arc<MediaDownloader>,
    config: Arc<Config>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr()?;
    let app = create_router(downloader, config);

    tracing::info!(address = %address, "API server listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
