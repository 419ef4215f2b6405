//! Progress reporting, from byte-count callbacks to task percentages.

use super::store::TaskStore;
use crate::extractor::ProgressCallback;
use crate::types::{Event, ProgressEvent, TaskId, TaskStatus};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Collaborator phase that carries byte counters
const DOWNLOADING_PHASE: &str = "downloading";

/// Translates collaborator progress events into task progress
#[derive(Clone)]
pub struct ProgressReporter {
    store: TaskStore,
    event_tx: broadcast::Sender<Event>,
}

impl ProgressReporter {
    /// Create a reporter writing into `store` and publishing on `event_tx`
    pub fn new(store: TaskStore, event_tx: broadcast::Sender<Event>) -> Self {
        Self { store, event_tx }
    }

    /// Apply one progress event to a task
    ///
    /// Only `downloading` events with a known, non-zero total move the
    /// percentage; anything else leaves the recorded value alone. Events for
    /// unknown tasks, or tasks no longer downloading, are dropped.
    pub fn report(&self, id: TaskId, event: &ProgressEvent) {
        if event.status != DOWNLOADING_PHASE {
            return;
        }
        let Some(total) = event.total() else {
            return;
        };
        let percent = compute_percent(event.downloaded_bytes.unwrap_or(0), total);

        let mut changed = false;
        self.store.update(id, |task| {
            if task.status == TaskStatus::Downloading && task.progress != percent {
                task.progress = percent;
                changed = true;
            }
        });

        if changed {
            tracing::debug!(task_id = %id, percent, "progress");
            self.event_tx.send(Event::Progress { id, percent }).ok();
        }
    }

    /// A callback bound to one task, suitable for [`Extractor::extract_and_save`](crate::extractor::Extractor::extract_and_save)
    pub fn bind(&self, id: TaskId) -> ProgressCallback {
        let reporter = self.clone();
        Arc::new(move |event: ProgressEvent| reporter.report(id, &event))
    }
}

/// `floor(downloaded / total * 100)` clamped to 0..=100
pub fn compute_percent(downloaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (u128::from(downloaded) * 100) / u128::from(total);
    percent.min(100) as u8
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn downloading_task() -> (ProgressReporter, TaskStore, TaskId, broadcast::Receiver<Event>) {
        let store = TaskStore::new();
        let (event_tx, rx) = broadcast::channel(64);
        let reporter = ProgressReporter::new(store.clone(), event_tx);
        let id = store.create("https://xhslink.com/a/1");
        assert!(store.mark_downloading(id));
        (reporter, store, id, rx)
    }

    #[test]
    fn test_compute_percent_floors_and_clamps() {
        assert_eq!(compute_percent(0, 100), 0);
        assert_eq!(compute_percent(999, 1000), 99);
        assert_eq!(compute_percent(1000, 1000), 100);
        assert_eq!(compute_percent(5000, 1000), 100);
        assert_eq!(compute_percent(1, 3), 33);
        assert_eq!(compute_percent(u64::MAX, u64::MAX), 100);
        assert_eq!(compute_percent(10, 0), 0);
    }

    #[test]
    fn test_report_uses_exact_total_then_estimate() {
        let (reporter, store, id, _rx) = downloading_task();

        reporter.report(id, &ProgressEvent::downloading(250, Some(1000), Some(5000)));
        assert_eq!(store.get(id).unwrap().progress, 25);

        reporter.report(id, &ProgressEvent::downloading(600, None, Some(1000)));
        assert_eq!(store.get(id).unwrap().progress, 60);
    }

    #[test]
    fn test_report_retains_progress_when_total_missing() {
        let (reporter, store, id, _rx) = downloading_task();

        reporter.report(id, &ProgressEvent::downloading(500, Some(1000), None));
        reporter.report(id, &ProgressEvent::downloading(700, None, None));
        reporter.report(id, &ProgressEvent::downloading(800, Some(0), Some(0)));

        assert_eq!(store.get(id).unwrap().progress, 50);
    }

    #[test]
    fn test_report_ignores_other_phases() {
        let (reporter, store, id, _rx) = downloading_task();

        reporter.report(
            id,
            &ProgressEvent {
                status: "finished".into(),
                downloaded_bytes: Some(1000),
                total_bytes: Some(1000),
                total_bytes_estimate: None,
            },
        );
        assert_eq!(store.get(id).unwrap().progress, 0);
        assert_eq!(store.get(id).unwrap().status, TaskStatus::Downloading);
    }

    #[test]
    fn test_report_discards_unknown_and_terminal_tasks() {
        let (reporter, store, id, _rx) = downloading_task();

        // Unknown task: silently dropped
        reporter.report(TaskId::new(), &ProgressEvent::downloading(1, Some(2), None));
        assert_eq!(store.len(), 1);

        // Late event after failure never touches the terminal record
        store.mark_failed(id, "failed");
        reporter.report(id, &ProgressEvent::downloading(900, Some(1000), None));
        assert_eq!(store.get(id).unwrap().progress, 0);
    }

    #[test]
    fn test_bound_callback_publishes_only_changes() {
        let (reporter, store, id, mut rx) = downloading_task();
        let callback = reporter.bind(id);

        callback(ProgressEvent::downloading(100, Some(1000), None));
        callback(ProgressEvent::downloading(105, Some(1000), None)); // still 10%
        callback(ProgressEvent::downloading(200, Some(1000), None));

        assert_eq!(store.get(id).unwrap().progress, 20);
        assert_eq!(rx.try_recv().unwrap(), Event::Progress { id, percent: 10 });
        assert_eq!(rx.try_recv().unwrap(), Event::Progress { id, percent: 20 });
        assert!(rx.try_recv().is_err());
    }
}
