use super::*;
use crate::downloader::test_helpers::{FakeExtractor, SOURCE_URL};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;


/// Helper to create a test MediaDownloader instance wrapped in Arc
async fn create_test_downloader() -> (Arc<MediaDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) = crate::downloader::test_helpers::create_test_downloader().await;
    (Arc::new(downloader), temp_dir)
}

/// Like [`create_test_downloader`] with a custom extractor and config tweaks
async fn create_test_downloader_with<F>(
    extractor: FakeExtractor,
    tweak: F,
) -> (Arc<MediaDownloader>, tempfile::TempDir)
where
    F: FnOnce(&mut Config),
{
    let (downloader, temp_dir) =
        crate::downloader::test_helpers::create_test_downloader_with(Arc::new(extractor), tweak)
            .await;
    (Arc::new(downloader), temp_dir)
}

fn router_for(downloader: &Arc<MediaDownloader>) -> Router {
    let config = downloader.get_config();
    create_router(downloader.clone(), config)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_api_server_serves_and_shuts_down() {
    let (downloader, _temp_dir) = create_test_downloader().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(serve(
        listener,
        downloader.clone(),
        downloader.get_config(),
        async move {
            stop_rx.await.ok();
        },
    ));

    let body: serde_json::Value = reqwest::get(format!("http://{address}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, serde_json::json!({"ok": true}));

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_cors_enabled() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = router_for(&downloader).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (downloader, _temp_dir) = create_test_downloader_with(FakeExtractor::default(), |config| {
        config.server.cors_enabled = false;
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = router_for(&downloader).oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (downloader, _temp_dir) = create_test_downloader_with(FakeExtractor::default(), |config| {
        config.server.cors_origins = vec!["https://media.example".to_string()];
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "https://media.example")
        .body(Body::empty())
        .unwrap();
    let response = router_for(&downloader).oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://media.example"
    );
}

#[tokio::test]
async fn test_swagger_ui_only_when_enabled() {
    let (downloader, _temp_dir) = create_test_downloader().await;
    let response = router_for(&downloader)
        .oneshot(get("/swagger-ui/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let (downloader, _temp_dir) = create_test_downloader_with(FakeExtractor::default(), |config| {
        config.server.swagger_ui = true;
    })
    .await;
    let (status, body) = send(router_for(&downloader), get("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/jobs"].is_object());
}
