//! OpenAPI documentation and schema generation
//!
//! The document is generated at compile time with utoipa.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl REST API
///
/// The document is served at:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (if enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl REST API",
        version = "0.1.0",
        description = "Server-side media downloads with progress polling, plus direct stream URLs for browser downloads",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5001", description = "Local server")
    ),
    paths(
        // Jobs
        crate::api::routes::create_job,
        crate::api::routes::get_job,
        crate::api::routes::get_job_file,
        crate::api::routes::cleanup,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::TaskId,
        crate::types::TaskStatus,
        crate::types::TaskInfo,
        crate::types::Event,

        // API request/response types
        crate::api::routes::JobMode,
        crate::api::routes::CreateJobRequest,
        crate::api::routes::CreateJobResponse,
        crate::api::routes::DirectUrlResponse,
        crate::api::routes::CleanupResponse,
        crate::api::routes::HealthResponse,

        // Error body
        crate::error::ApiError,
    )),
    tags(
        (name = "jobs", description = "Jobs - Submit URLs, poll status, fetch files, clean up output"),
        (name = "system", description = "System endpoints - Health check, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
