//! Shutdown coordination.

use crate::types::Event;

use super::MediaDownloader;

impl MediaDownloader {
    /// Gracefully shut down the downloader
    ///
    /// New submissions are rejected from here on. Running jobs are not
    /// cancelled; they get the configured grace period to finish, after which
    /// shutdown proceeds anyway and unfinished workers are left to the runtime.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating graceful shutdown");

        let grace = self.config.download.shutdown_grace;
        if self.runner.shutdown(grace).await {
            tracing::info!("All running jobs finished");
        } else {
            tracing::warn!(
                active = self.runner.active_jobs(),
                ?grace,
                "Timeout waiting for running jobs, proceeding with shutdown"
            );
        }

        let _ = self.event_tx.send(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
    }

    /// Whether new jobs are still accepted
    pub fn is_accepting(&self) -> bool {
        self.runner.is_accepting()
    }
}
