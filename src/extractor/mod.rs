//! Media extraction collaborator
//!
//! The downloader core never extracts media itself. It talks to an
//! [`Extractor`], which resolves metadata and saves files. The shipped
//! implementation is [`YtDlpExtractor`], which drives a `yt-dlp` binary;
//! tests substitute scripted fakes.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ExtractError;
use crate::types::{MediaDescriptor, OutputTemplate, ProgressEvent, SavedMedia};

mod ytdlp;

pub use ytdlp::YtDlpExtractor;

/// Progress sink handed to [`Extractor::extract_and_save`]
///
/// Called synchronously, in emission order, possibly at high frequency.
/// Implementations behind it must not block.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Trait for the external media extraction capability
///
/// # Examples
///
/// ```no_run
/// use media_dl::extractor::{Extractor, YtDlpExtractor};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = YtDlpExtractor::from_path("best", Vec::new())?;
///
/// let descriptor = extractor
///     .resolve("https://www.xiaohongshu.com/explore/64f0c0de000000001e03b2a1")
///     .await?;
/// println!("live: {}", descriptor.is_live());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Resolve media metadata without writing any file
    ///
    /// # Errors
    ///
    /// Returns an error if the collaborator cannot be run, fails, or answers
    /// with output that does not parse into a [`MediaDescriptor`].
    async fn resolve(&self, url: &str) -> Result<MediaDescriptor, ExtractError>;

    /// Download `url` to a path derived from `template`, reporting progress
    ///
    /// # Errors
    ///
    /// Returns an error if the collaborator fails or does not report the
    /// path of the saved file.
    async fn extract_and_save(
        &self,
        url: &str,
        template: &OutputTemplate,
        progress: ProgressCallback,
    ) -> Result<SavedMedia, ExtractError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
