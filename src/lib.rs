//! # media-dl
//!
//! HTTP job service that fetches media from supported pages for browser clients.
//!
//! Two ways to get a file:
//! - **Background jobs** - the server downloads the media under a task id; the
//!   client polls status and fetches the file once the task completes.
//! - **Direct mode** - the server resolves a streamable URL within a short
//!   deadline and the browser downloads it itself; nothing is stored.
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, MediaDownloader, TaskStatus};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = MediaDownloader::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let job = downloader.spawn_job("https://www.xiaohongshu.com/explore/64f1a2b3")?;
//!     if job.completion.await? == TaskStatus::Completed {
//!         let (path, name) = downloader.task_file(job.id).await?;
//!         println!("saved {name} at {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Output directory sweeping
pub mod cleanup;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Media extraction collaborators
pub mod extractor;
/// Public tunnel integration
pub mod tunnel;
/// Core types and events
pub mod types;
/// Source URL allow-list
pub mod url_filter;

// Re-export commonly used types
pub use config::Config;
pub use downloader::{JobHandle, MediaDownloader};
pub use error::{ApiError, Error, ExtractError, ResolveError, Result, ToHttpStatus};
pub use extractor::{Extractor, ProgressCallback, YtDlpExtractor};
pub use types::{Event, MediaDescriptor, ProgressEvent, SavedMedia, TaskId, TaskInfo, TaskStatus};

/// Resolves once the process receives a termination signal
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Pass it to [`api::start_api_server`] for graceful shutdown.
pub async fn shutdown_signal() {
    wait_for_signal().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
