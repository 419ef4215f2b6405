//! Core downloader implementation split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`store`] - In-memory task records
//! - [`progress`] - Byte counters to task percentages
//! - [`runner`] - Background job workers
//! - [`direct`] - Bounded direct-URL resolution
//! - [`control`] - Request-facing operations (submit, status, file lookup)
//! - [`lifecycle`] - Shutdown coordination
//! - [`services`] - Background service starters

mod control;
mod direct;
mod lifecycle;
mod progress;
mod runner;
mod services;
mod store;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use direct::{DirectResolver, best_format, select_direct_url};
pub use progress::{ProgressReporter, compute_percent};
pub use runner::{JobHandle, JobRunner};
pub use store::TaskStore;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extractor::{Extractor, YtDlpExtractor};
use crate::types::Event;
use crate::url_filter::SourceFilter;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Event bus capacity; slow subscribers past this see `RecvError::Lagged`
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct MediaDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Task records shared with every worker
    pub(crate) store: TaskStore,
    /// Background worker pool
    pub(crate) runner: JobRunner,
    /// Direct-mode resolver
    pub(crate) resolver: DirectResolver,
    /// Source URL allow-list
    pub(crate) sources: SourceFilter,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
}

impl MediaDownloader {
    /// Create a downloader backed by the yt-dlp binary
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, the output directory cannot be
    /// created, or no yt-dlp binary can be found.
    pub async fn new(config: Config) -> Result<Self> {
        let extractor = YtDlpExtractor::from_config(&config)?;
        tracing::info!(
            binary = %extractor.binary_path().display(),
            "yt-dlp extractor initialized"
        );
        Self::with_extractor(config, Arc::new(extractor)).await
    }

    /// Create a downloader over any [`Extractor`]
    pub async fn with_extractor(config: Config, extractor: Arc<dyn Extractor>) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(config.output_dir())
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "failed to create output directory '{}': {}",
                        config.output_dir().display(),
                        e
                    ),
                ))
            })?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let store = TaskStore::new();
        let runner = JobRunner::new(
            store.clone(),
            extractor.clone(),
            config.output_dir().clone(),
            config.download.max_concurrent_jobs,
            event_tx.clone(),
        );
        let sources = SourceFilter::new(config.sources.allowed_domains.iter());

        tracing::info!(
            extractor = extractor.name(),
            output_dir = %config.output_dir().display(),
            max_concurrent_jobs = ?config.download.max_concurrent_jobs,
            "downloader initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            runner,
            resolver: DirectResolver::new(extractor),
            sources,
            event_tx,
        })
    }

    /// Subscribe to task lifecycle events
    ///
    /// Each subscriber receives every event independently.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Number of tasks recorded since startup
    pub fn task_count(&self) -> usize {
        self.store.len()
    }

    #[cfg(test)]
    pub(crate) fn tasks(&self) -> &TaskStore {
        &self.store
    }
}
