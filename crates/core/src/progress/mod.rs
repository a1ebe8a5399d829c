use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// How long a finished task's entry stays pollable before eviction.
pub const EVICTION_GRACE: Duration = Duration::from_secs(60);

/// Completion counters for one task. Unknown tasks poll as `0/1`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            completed: 0,
            total: 1,
        }
    }
}

/// Task registry mapping task ids to completion counters.
///
/// Entries for distinct tasks are independent; each update replaces the
/// whole pair, so a poll never observes a torn `{completed, total}`.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    inner: Arc<Mutex<HashMap<String, Progress>>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fresh entry for `task_id` with zero completed segments.
    pub async fn start(&self, task_id: &str, total: usize) {
        let mut map = self.inner.lock().await;
        map.insert(
            task_id.to_owned(),
            Progress {
                completed: 0,
                total: total.max(1),
            },
        );
    }

    /// Records that `completed` segments are done. The counter is
    /// clamped to the task total and never moves backwards.
    pub async fn update(&self, task_id: &str, completed: usize) {
        let mut map = self.inner.lock().await;
        if let Some(entry) = map.get_mut(task_id) {
            let next = entry.completed.max(completed.min(entry.total));
            *entry = Progress {
                completed: next,
                total: entry.total,
            };
        }
    }

    /// Current counters for `task_id`; defaults to `0/1` when unknown.
    pub async fn snapshot(&self, task_id: &str) -> Progress {
        let map = self.inner.lock().await;
        map.get(task_id).copied().unwrap_or_default()
    }

    /// Schedules the entry for removal after `grace`, keeping it
    /// pollable in the meantime. Called on task completion, success or
    /// failure alike.
    pub fn finish(&self, task_id: &str, grace: Duration) {
        let tracker = self.clone();
        let task_id = task_id.to_owned();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            tracker.remove(&task_id).await;
            debug!(task_id = %task_id, "evicted progress entry");
        });
    }

    pub async fn remove(&self, task_id: &str) {
        let mut map = self.inner.lock().await;
        map.remove(task_id);
    }
}
