//! Background job runner: one detached worker per download request.
//!
//! Workers are tokio tasks tracked by a [`TaskTracker`]. Each worker owns its
//! task record until it reaches a terminal state; nothing else writes to it.
//! Workers are never cancelled once spawned.

use super::progress::ProgressReporter;
use super::store::TaskStore;
use crate::error::{Error, MSG_DOWNLOAD_FAILED, Result};
use crate::extractor::Extractor;
use crate::types::{Event, OutputTemplate, TaskId, TaskStatus};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// A spawned job: its task id and a handle resolving to its terminal status
#[derive(Debug)]
pub struct JobHandle {
    /// Task id allocated for the job
    pub id: TaskId,
    /// Resolves once the worker has recorded a terminal status
    pub completion: JoinHandle<TaskStatus>,
}

/// Spawns and drives download workers
#[derive(Clone)]
pub struct JobRunner {
    store: TaskStore,
    reporter: ProgressReporter,
    extractor: Arc<dyn Extractor>,
    output_dir: PathBuf,
    /// Worker limit; `None` means every job starts immediately
    limit: Option<Arc<Semaphore>>,
    tracker: TaskTracker,
    event_tx: broadcast::Sender<Event>,
    accepting_new: Arc<AtomicBool>,
}

impl JobRunner {
    /// Create a runner writing files under `output_dir`
    pub fn new(
        store: TaskStore,
        extractor: Arc<dyn Extractor>,
        output_dir: PathBuf,
        max_concurrent_jobs: Option<usize>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            reporter: ProgressReporter::new(store.clone(), event_tx.clone()),
            store,
            extractor,
            output_dir,
            limit: max_concurrent_jobs.map(|n| Arc::new(Semaphore::new(n))),
            tracker: TaskTracker::new(),
            event_tx,
            accepting_new: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Start a job and return its id without waiting for it
    pub fn submit(&self, url: &str) -> Result<TaskId> {
        self.spawn_job(url).map(|handle| handle.id)
    }

    /// Start a job and return a handle to its completion
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun.
    pub fn spawn_job(&self, url: &str) -> Result<JobHandle> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let id = self.store.create(url);
        tracing::info!(task_id = %id, url = %url, "job queued");
        self.event_tx
            .send(Event::Queued {
                id,
                url: url.to_string(),
            })
            .ok();

        let worker = self.clone();
        let url = url.to_string();
        let completion = self
            .tracker
            .spawn(async move { worker.run_job(id, url).await });

        Ok(JobHandle { id, completion })
    }

    /// Worker body: `queued -> downloading -> {completed|failed}`
    async fn run_job(self, id: TaskId, url: String) -> TaskStatus {
        let _permit = match &self.limit {
            Some(limit) => limit.clone().acquire_owned().await.ok(),
            None => None,
        };

        if !self.store.mark_downloading(id) {
            return self
                .store
                .get(id)
                .map(|task| task.status)
                .unwrap_or(TaskStatus::Failed);
        }
        tracing::info!(task_id = %id, extractor = self.extractor.name(), "job started");
        self.event_tx.send(Event::Downloading { id }).ok();

        let template = OutputTemplate::for_task(&self.output_dir, id);
        let progress = self.reporter.bind(id);
        let outcome = AssertUnwindSafe(self.extractor.extract_and_save(&url, &template, progress))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(saved)) => {
                let filename = saved.filename();
                self.store.mark_completed(id, &saved);
                tracing::info!(
                    task_id = %id,
                    filename = %filename,
                    title = saved.title.as_deref().unwrap_or(""),
                    "job completed"
                );
                self.event_tx.send(Event::Completed { id, filename }).ok();
                TaskStatus::Completed
            }
            Ok(Err(e)) => {
                tracing::error!(task_id = %id, url = %url, error = %e, "job failed");
                self.fail(id)
            }
            Err(_) => {
                tracing::error!(task_id = %id, url = %url, "job failed: extractor panicked");
                self.fail(id)
            }
        }
    }

    fn fail(&self, id: TaskId) -> TaskStatus {
        self.store.mark_failed(id, MSG_DOWNLOAD_FAILED);
        self.event_tx.send(Event::Failed { id }).ok();
        TaskStatus::Failed
    }

    /// Number of workers that have not finished yet
    pub fn active_jobs(&self) -> usize {
        self.tracker.len()
    }

    /// Whether [`spawn_job`](Self::spawn_job) still accepts work
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Stop accepting jobs and wait up to `grace` for running workers
    ///
    /// Running workers are not cancelled. Returns whether every worker
    /// finished within the grace period.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.accepting_new.store(false, Ordering::SeqCst);
        self.tracker.close();
        tracing::info!(active = self.tracker.len(), "waiting for running jobs");
        tokio::time::timeout(grace, self.tracker.wait()).await.is_ok()
    }
}
