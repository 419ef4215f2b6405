//! Extractor stand-in driven through the public trait

use async_trait::async_trait;
use media_dl::types::{FormatCandidate, OutputTemplate};
use media_dl::{Extractor, ExtractError, MediaDescriptor, ProgressCallback, ProgressEvent, SavedMedia};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Source URL accepted by the default allow-list
pub const SOURCE_URL: &str = "https://www.xiaohongshu.com/explore/6500aa11bb22cc33dd44ee55";

/// Bytes every scripted download writes
pub const MEDIA_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42 scripted";

/// Extractor that answers from fixed data
pub struct ScriptedExtractor {
    pub descriptor: MediaDescriptor,
    pub title: String,
    pub download_delay: Duration,
    pub fail_downloads: bool,
    pub downloads: AtomicUsize,
}

impl Default for ScriptedExtractor {
    fn default() -> Self {
        Self {
            descriptor: MediaDescriptor {
                title: Some("clip".to_string()),
                formats: Some(vec![
                    FormatCandidate {
                        height: Some(360),
                        url: Some("https://cdn.example/360.mp4".to_string()),
                        ..Default::default()
                    },
                    FormatCandidate {
                        height: Some(1080),
                        url: Some("https://cdn.example/1080.mp4".to_string()),
                        ..Default::default()
                    },
                ]),
                ..Default::default()
            },
            title: "river walk".to_string(),
            download_delay: Duration::from_millis(20),
            fail_downloads: false,
            downloads: AtomicUsize::new(0),
        }
    }
}

impl ScriptedExtractor {
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn resolve(&self, _url: &str) -> Result<MediaDescriptor, ExtractError> {
        Ok(self.descriptor.clone())
    }

    async fn extract_and_save(
        &self,
        _url: &str,
        template: &OutputTemplate,
        progress: ProgressCallback,
    ) -> Result<SavedMedia, ExtractError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let total = MEDIA_BYTES.len() as u64;

        progress(ProgressEvent::downloading(0, Some(total), None));
        tokio::time::sleep(self.download_delay).await;
        if self.fail_downloads {
            return Err(ExtractError::Failed(
                "ERROR: [XiaoHongShu] 6500aa11: Requested format is not available".to_string(),
            ));
        }
        progress(ProgressEvent::downloading(total, Some(total), None));

        let filepath = PathBuf::from(
            template
                .as_str()
                .replace("%(title)s", &self.title)
                .replace("%(ext)s", "mp4"),
        );
        tokio::fs::write(&filepath, MEDIA_BYTES).await?;
        Ok(SavedMedia {
            filepath,
            title: Some(self.title.clone()),
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
