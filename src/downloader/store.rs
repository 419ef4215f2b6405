//! In-memory task store.
//!
//! The store is the only shared mutable structure in the downloader. Every
//! access takes the lock for a single O(1) map operation, so it is safe to
//! touch from async workers and from synchronous progress callbacks alike.

use crate::types::{SavedMedia, Task, TaskId, TaskStatus};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Process-wide mapping from task id to task record (cloneable handle)
#[derive(Clone, Default)]
pub struct TaskStore {
    tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl TaskStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh `queued` task for `url` and return its id
    pub fn create(&self, url: impl Into<String>) -> TaskId {
        let mut task = Task::new(url);
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        while tasks.contains_key(&task.id) {
            task.id = TaskId::new();
        }
        let id = task.id;
        tasks.insert(id, task);
        id
    }

    /// Snapshot of a task record
    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Apply `f` to the record if it exists
    ///
    /// Unknown ids are a no-op, not an error. Returns whether a record was updated.
    /// Status changes go through the `mark_*` helpers instead.
    pub(crate) fn update<F>(&self, id: TaskId, f: F) -> bool
    where
        F: FnOnce(&mut Task),
    {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        match tasks.get_mut(&id) {
            Some(task) => {
                f(task);
                true
            }
            None => false,
        }
    }

    /// `queued -> downloading`
    pub fn mark_downloading(&self, id: TaskId) -> bool {
        self.transition(id, TaskStatus::Downloading, |_| {})
    }

    /// `downloading -> completed`, recording the saved file and forcing progress to 100
    pub fn mark_completed(&self, id: TaskId, saved: &SavedMedia) -> bool {
        let filename = saved.filename();
        self.transition(id, TaskStatus::Completed, |task| {
            task.progress = 100;
            task.filename = Some(filename);
            task.filepath = Some(saved.filepath.clone());
            task.title = saved.title.clone();
        })
    }

    /// `downloading -> failed` with a client-safe message
    pub fn mark_failed(&self, id: TaskId, message: &str) -> bool {
        self.transition(id, TaskStatus::Failed, |task| {
            task.error = Some(message.to_string());
        })
    }

    /// Move a task along the lifecycle, refusing any edge the state machine doesn't allow
    fn transition<F>(&self, id: TaskId, next: TaskStatus, apply: F) -> bool
    where
        F: FnOnce(&mut Task),
    {
        let mut applied = false;
        let known = self.update(id, |task| {
            if task.status.can_transition_to(next) {
                task.status = next;
                apply(task);
                applied = true;
            } else {
                tracing::warn!(
                    task_id = %id,
                    from = %task.status,
                    to = %next,
                    "refusing invalid task transition"
                );
            }
        });
        known && applied
    }

    /// Number of tasks recorded
    pub fn len(&self) -> usize {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no task has been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore").field("len", &self.len()).finish()
    }
}
