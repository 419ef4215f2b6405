//! Shared test helpers: a scripted extractor and MediaDownloader constructors.

use crate::config::Config;
use crate::downloader::MediaDownloader;
use crate::error::ExtractError;
use crate::extractor::{Extractor, ProgressCallback};
use crate::types::{
    FormatCandidate, MediaDescriptor, OutputTemplate, ProgressEvent, SavedMedia, TaskId,
    TaskStatus,
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::Semaphore;

/// Source URL accepted by the default allow-list
pub(crate) const SOURCE_URL: &str = "https://www.xiaohongshu.com/explore/64f1a2b3c4d5e6f7a8b9c0d1";

/// Error text carrying detail that must never reach a client
pub(crate) const LEAKY_DETAIL: &str = "HTTP Error 403: Forbidden for /srv/secret/cookies.txt";

/// Extractor with scripted behaviour
pub(crate) struct FakeExtractor {
    pub(crate) descriptor: MediaDescriptor,
    pub(crate) resolve_fails: bool,
    pub(crate) resolve_delay: Option<Duration>,
    /// When set, each download waits for one permit before finishing
    pub(crate) download_gate: Option<Arc<Semaphore>>,
    pub(crate) download_fails: bool,
    pub(crate) download_panics: bool,
    pub(crate) progress: Vec<ProgressEvent>,
    pub(crate) title: String,
    pub(crate) resolve_calls: AtomicUsize,
    pub(crate) download_calls: AtomicUsize,
}

impl Default for FakeExtractor {
    fn default() -> Self {
        Self {
            descriptor: descriptor_with_heights(&[480, 720]),
            resolve_fails: false,
            resolve_delay: None,
            download_gate: None,
            download_fails: false,
            download_panics: false,
            progress: vec![
                ProgressEvent::downloading(0, Some(1000), None),
                ProgressEvent::downloading(500, Some(1000), None),
                ProgressEvent::downloading(1000, Some(1000), None),
            ],
            title: "花园散步".to_string(),
            resolve_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeExtractor {
    /// Downloads block until the returned gate hands out permits
    pub(crate) fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let fake = Self {
            download_gate: Some(gate.clone()),
            ..Self::default()
        };
        (fake, gate)
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn resolve(&self, _url: &str) -> Result<MediaDescriptor, ExtractError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.resolve_delay {
            tokio::time::sleep(delay).await;
        }
        if self.resolve_fails {
            return Err(ExtractError::Failed(LEAKY_DETAIL.to_string()));
        }
        Ok(self.descriptor.clone())
    }

    async fn extract_and_save(
        &self,
        _url: &str,
        template: &OutputTemplate,
        progress: ProgressCallback,
    ) -> Result<SavedMedia, ExtractError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.download_gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if self.download_panics {
            panic!("extractor blew up");
        }
        if self.download_fails {
            return Err(ExtractError::Failed(LEAKY_DETAIL.to_string()));
        }

        for event in &self.progress {
            progress(event.clone());
        }

        let filepath = PathBuf::from(
            template
                .as_str()
                .replace("%(title)s", &self.title)
                .replace("%(ext)s", "mp4"),
        );
        tokio::fs::write(&filepath, b"fake media bytes").await?;
        Ok(SavedMedia {
            filepath,
            title: Some(self.title.clone()),
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Descriptor whose `formats` list has one candidate per height
pub(crate) fn descriptor_with_heights(heights: &[u32]) -> MediaDescriptor {
    MediaDescriptor {
        title: Some("clip".to_string()),
        formats: Some(
            heights
                .iter()
                .map(|h| FormatCandidate {
                    height: Some(*h),
                    url: Some(format!("https://cdn.example/{h}.mp4")),
                    ..Default::default()
                })
                .collect(),
        ),
        ..Default::default()
    }
}

/// Helper to create a test MediaDownloader over the default fake extractor.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader() -> (MediaDownloader, tempfile::TempDir) {
    create_test_downloader_with(Arc::new(FakeExtractor::default()), |_| {}).await
}

/// Like [`create_test_downloader`] with a custom extractor and config tweaks
pub(crate) async fn create_test_downloader_with<F>(
    extractor: Arc<FakeExtractor>,
    tweak: F,
) -> (MediaDownloader, tempfile::TempDir)
where
    F: FnOnce(&mut Config),
{
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.download.output_dir = temp_dir.path().join("downloads");
    config.download.shutdown_grace = Duration::from_secs(5);
    config.direct.timeout = Duration::from_secs(2);
    tweak(&mut config);

    let downloader = MediaDownloader::with_extractor(config, extractor)
        .await
        .unwrap();
    (downloader, temp_dir)
}

/// Poll until the task reaches `status` or a few seconds pass
pub(crate) async fn wait_for_status(downloader: &MediaDownloader, id: TaskId, status: TaskStatus) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if downloader.task(id).map(|t| t.status) == Some(status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("task {id} never reached {status}"));
}
