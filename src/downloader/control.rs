//! Request-facing operations: submission, direct resolution, status and file lookup.

use crate::cleanup;
use crate::error::{Error, MSG_INVALID_SOURCE, MSG_URL_REQUIRED, Result};
use crate::types::{Task, TaskId, TaskInfo, TaskStatus};
use std::path::PathBuf;

use super::{JobHandle, MediaDownloader};

impl MediaDownloader {
    /// Check a submitted source URL against presence and the allow-list
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] with `"url is required"` for a missing or
    /// blank value, or `"invalid source url"` for a disallowed one.
    pub fn validate_source<'a>(&self, url: Option<&'a str>) -> Result<&'a str> {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(Error::Validation(MSG_URL_REQUIRED))?;
        if !self.sources.is_allowed(url) {
            tracing::info!(url = %url, "rejected source url");
            return Err(Error::Validation(MSG_INVALID_SOURCE));
        }
        Ok(url)
    }

    /// Start a background job for `url` and return its task id immediately
    pub fn submit(&self, url: &str) -> Result<TaskId> {
        self.runner.submit(url)
    }

    /// Start a background job and keep a handle to its completion
    pub fn spawn_job(&self, url: &str) -> Result<JobHandle> {
        self.runner.spawn_job(url)
    }

    /// Resolve a direct stream URL within the configured deadline
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolve`]; see [`ResolveError`](crate::error::ResolveError)
    /// for the taxonomy.
    pub async fn resolve_direct(&self, url: &str) -> Result<String> {
        Ok(self
            .resolver
            .resolve_direct(url, self.config.direct.timeout)
            .await?)
    }

    /// Snapshot of a task record
    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.store.get(id)
    }

    /// Client-facing view of a task
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn task_info(&self, id: TaskId) -> Result<TaskInfo> {
        self.store
            .get(id)
            .map(|task| TaskInfo::from(&task))
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Path and download name of a completed task's file
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] for an unknown id
    /// - [`Error::StateConflict`] if the task has not completed
    /// - [`Error::FileMissing`] if the file is gone (e.g. swept)
    pub async fn task_file(&self, id: TaskId) -> Result<(PathBuf, String)> {
        let task = self
            .store
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        if task.status != TaskStatus::Completed {
            return Err(Error::StateConflict {
                id,
                status: task.status,
            });
        }

        let Some(path) = task.filepath else {
            return Err(Error::FileMissing { id });
        };
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            _ => {
                tracing::warn!(task_id = %id, path = %path.display(), "completed task file is gone");
                return Err(Error::FileMissing { id });
            }
        }

        let filename = task.filename.unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        Ok((path, filename))
    }

    /// Delete output files older than the configured retention
    ///
    /// Returns how many files were removed. Task records are not touched.
    pub async fn cleanup(&self) -> Result<usize> {
        cleanup::sweep_expired(self.config.output_dir(), self.config.cleanup.retention).await
    }
}
