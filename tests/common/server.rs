//! Running a real server on an ephemeral port

use media_dl::{Config, Extractor, MediaDownloader};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A served API plus everything that must outlive it
pub struct TestServer {
    pub address: SocketAddr,
    pub downloader: Arc<MediaDownloader>,
    pub client: reqwest::Client,
    pub temp_dir: TempDir,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<media_dl::Result<()>>,
}

impl TestServer {
    /// Serve over `extractor` with test-friendly defaults, then apply `tweak`
    pub async fn start<F>(extractor: Arc<dyn Extractor>, tweak: F) -> Self
    where
        F: FnOnce(&mut Config),
    {
        let temp_dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.download.output_dir = temp_dir.path().join("out");
        config.download.shutdown_grace = Duration::from_secs(5);
        config.direct.timeout = Duration::from_secs(2);
        tweak(&mut config);

        let downloader = Arc::new(
            MediaDownloader::with_extractor(config, extractor)
                .await
                .expect("downloader"),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(media_dl::api::serve(
            listener,
            downloader.clone(),
            downloader.get_config(),
            async move {
                stop_rx.await.ok();
            },
        ));

        Self {
            address,
            downloader,
            client: reqwest::Client::new(),
            temp_dir,
            stop: Some(stop_tx),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    pub async fn post_job(&self, body: serde_json::Value) -> (reqwest::StatusCode, serde_json::Value) {
        let response = self
            .client
            .post(self.url("/jobs"))
            .json(&body)
            .send()
            .await
            .expect("POST /jobs");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }

    pub async fn get_json(&self, path: &str) -> (reqwest::StatusCode, serde_json::Value) {
        let response = self.client.get(self.url(path)).send().await.expect("GET");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }

    /// Poll `/jobs/{id}` until the task leaves the running states
    pub async fn wait_until_settled(&self, task_id: &str) -> serde_json::Value {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let (_, info) = self.get_json(&format!("/jobs/{task_id}")).await;
                if info["status"] == "completed" || info["status"] == "failed" {
                    return info;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("task never settled")
    }

    /// Stop accepting connections and wait for the server task
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            stop.send(()).ok();
        }
        tokio::time::timeout(Duration::from_secs(5), &mut self.handle)
            .await
            .expect("server did not stop")
            .expect("server task panicked")
            .expect("server error");
    }
}
