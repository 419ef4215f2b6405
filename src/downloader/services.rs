//! Background service starters: the periodic output sweeper.

use super::MediaDownloader;

impl MediaDownloader {
    /// Start the periodic output sweeper
    ///
    /// Does nothing when no sweep interval is configured. The loop ends once
    /// the downloader stops accepting jobs.
    pub fn start_cleanup_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let Some(period) = self.config.cleanup.interval else {
            tracing::info!("No cleanup interval configured, skipping output sweeper");
            return tokio::spawn(async {});
        };

        let downloader = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if !downloader.is_accepting() {
                    break;
                }
                match downloader.cleanup().await {
                    Ok(removed) => tracing::debug!(removed, "scheduled sweep done"),
                    Err(e) => tracing::error!(error = %e, "scheduled sweep failed"),
                }
            }
            tracing::info!("Output sweeper stopped");
        });

        tracing::info!(?period, "Output sweeper started");
        handle
    }
}
