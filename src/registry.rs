//! In-flight task bookkeeping.
//!
//! The [`TaskRegistry`] is the single source of truth for "is this resource
//! currently being fetched". It owns every task, keyed by [`ResourceId`], and
//! enforces at most one task per key. All mutations go through one mutex so
//! concurrent requests for the same resource cannot race into two fetches.
//!
//! Callbacks are never run under the lock: [`TaskRegistry::complete`] hands
//! them back to the caller, which delivers them.

use crate::download::{Payload, ResourceId};
use crate::downloader::config::DownloadCallback;
use crate::error::Result;

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Lifecycle of a download task.
///
/// `Pending -> InFlight -> Completed | Failed | Cancelled`. A pending task may
/// also go straight to a terminal state when it is cancelled before its fetch
/// starts. Terminal states have no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Registered, transport not started yet.
    Pending,
    /// Transport fetch issued.
    InFlight,
    /// Payload fetched.
    Completed,
    /// Transport failure.
    Failed,
    /// Aborted by `cancel` or `cancel_all`.
    Cancelled,
}

impl TaskState {
    /// Whether the state is final.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }

    fn can_advance_to(self, next: TaskState) -> bool {
        match (self, next) {
            (TaskState::Pending, TaskState::InFlight) => true,
            (TaskState::Pending | TaskState::InFlight, next) => next.is_terminal(),
            _ => false,
        }
    }

    /// Terminal state for a fetch outcome.
    pub(crate) fn for_outcome(outcome: &Result<Payload>) -> Self {
        match outcome {
            Ok(_) => TaskState::Completed,
            Err(e) if e.is_cancelled() => TaskState::Cancelled,
            Err(_) => TaskState::Failed,
        }
    }
}

/// One in-flight transfer. Never leaves the registry.
struct DownloadTask {
    abort: CancellationToken,
    callbacks: Vec<DownloadCallback>,
    state: TaskState,
}

impl DownloadTask {
    fn new() -> Self {
        Self {
            abort: CancellationToken::new(),
            callbacks: Vec::new(),
            state: TaskState::Pending,
        }
    }

    fn advance(&mut self, next: TaskState) -> bool {
        if self.state.can_advance_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }
}

/// Result of [`TaskRegistry::register_or_join`].
#[derive(Debug)]
pub(crate) enum Registration {
    /// A fresh task was created; the caller must start its fetch.
    New { abort: CancellationToken },
    /// The callback was queued behind an existing task.
    Joined { waiters: usize },
}

impl Registration {
    #[cfg(test)]
    pub(crate) fn is_new_task(&self) -> bool {
        matches!(self, Registration::New { .. })
    }
}

/// Read-only view of a task, used for cancellation.
#[derive(Debug, Clone)]
pub(crate) struct TaskSnapshot {
    pub(crate) resource: ResourceId,
    pub(crate) state: TaskState,
    abort: CancellationToken,
}

impl TaskSnapshot {
    /// Request cancellation of the underlying transfer.
    pub(crate) fn abort(&self) {
        self.abort.cancel();
    }
}

/// Callbacks released by [`TaskRegistry::complete`], in registration order.
pub(crate) struct Completion {
    pub(crate) state: TaskState,
    pub(crate) callbacks: Vec<DownloadCallback>,
}

/// Map from resource to its single in-flight task.
#[derive(Default)]
pub(crate) struct TaskRegistry {
    tasks: Mutex<HashMap<ResourceId, DownloadTask>>,
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.len())
            .finish()
    }
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue `callback` for `resource`, creating the task if none exists.
    pub(crate) fn register_or_join(
        &self,
        resource: &ResourceId,
        callback: DownloadCallback,
    ) -> Registration {
        let mut tasks = self.tasks.lock();
        match tasks.get_mut(resource) {
            Some(task) => {
                task.callbacks.push(callback);
                Registration::Joined {
                    waiters: task.callbacks.len(),
                }
            }
            None => {
                let mut task = DownloadTask::new();
                task.callbacks.push(callback);
                let abort = task.abort.clone();
                tasks.insert(resource.clone(), task);
                Registration::New { abort }
            }
        }
    }

    /// Record that the transport fetch for `resource` has been issued.
    ///
    /// Returns false if the task is gone or no longer pending.
    pub(crate) fn mark_in_flight(&self, resource: &ResourceId) -> bool {
        let mut tasks = self.tasks.lock();
        tasks
            .get_mut(resource)
            .map_or(false, |task| task.advance(TaskState::InFlight))
    }

    /// Finish the task for `resource` and remove it.
    ///
    /// The next registration for the same resource starts a fresh task.
    pub(crate) fn complete(&self, resource: &ResourceId, outcome: &Result<Payload>) -> Completion {
        let state = TaskState::for_outcome(outcome);
        let removed = self.tasks.lock().remove(resource);

        match removed {
            Some(mut task) => {
                if !task.advance(state) {
                    warn!(
                        "Task for {} moved from {:?} to {:?}",
                        resource, task.state, state
                    );
                }
                debug!(
                    "Task for {} finished as {:?} with {} waiter(s)",
                    resource,
                    state,
                    task.callbacks.len()
                );
                Completion {
                    state,
                    callbacks: task.callbacks,
                }
            }
            None => {
                warn!("No task registered for {}", resource);
                Completion {
                    state,
                    callbacks: Vec::new(),
                }
            }
        }
    }

    /// Snapshot of every task currently registered.
    pub(crate) fn all_tasks(&self) -> Vec<TaskSnapshot> {
        self.tasks
            .lock()
            .iter()
            .map(|(resource, task)| TaskSnapshot {
                resource: resource.clone(),
                state: task.state,
                abort: task.abort.clone(),
            })
            .collect()
    }

    /// Snapshot of the task for `resource`, if any.
    pub(crate) fn get(&self, resource: &ResourceId) -> Option<TaskSnapshot> {
        self.tasks.lock().get(resource).map(|task| TaskSnapshot {
            resource: resource.clone(),
            state: task.state,
            abort: task.abort.clone(),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
